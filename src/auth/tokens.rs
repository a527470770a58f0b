use anyhow::Context;
use rand::RngCore;
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::error::ApiError;

pub const VERIFICATION_TTL: Duration = Duration::hours(24);
pub const RESET_TTL: Duration = Duration::hours(1);

/// Single-use opaque token bound to an email address. Same row shape for
/// verification and reset tokens; they live in separate tables so the two
/// intents can never be confused.
#[derive(Debug, Clone, FromRow)]
pub struct EmailToken {
    pub email: String,
    pub token: String,
    pub expires: OffsetDateTime,
}

/// 32 random bytes, hex-encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issue a fresh verification token for `email`. Upserts on email, so a
/// re-issue invalidates any previous token instead of leaving two live ones.
pub async fn issue_verification(db: &PgPool, email: &str) -> anyhow::Result<String> {
    let token = generate_token();
    let expires = OffsetDateTime::now_utc() + VERIFICATION_TTL;
    sqlx::query(
        r#"
        INSERT INTO verification_tokens (email, token, expires)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET token = EXCLUDED.token, expires = EXCLUDED.expires
        "#,
    )
    .bind(email)
    .bind(&token)
    .bind(expires)
    .execute(db)
    .await
    .context("store verification token")?;
    debug!(email = %email, "verification token issued");
    Ok(token)
}

pub async fn issue_reset(db: &PgPool, email: &str) -> anyhow::Result<String> {
    let token = generate_token();
    let expires = OffsetDateTime::now_utc() + RESET_TTL;
    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (email, token, expires)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET token = EXCLUDED.token, expires = EXCLUDED.expires
        "#,
    )
    .bind(email)
    .bind(&token)
    .bind(expires)
    .execute(db)
    .await
    .context("store reset token")?;
    debug!(email = %email, "password reset token issued");
    Ok(token)
}

/// Consume a verification token: mark the account verified and delete the
/// token in one transaction, so a crash cannot leave the token consumable a
/// second time. Expired tokens are deleted on detection.
pub async fn consume_verification(db: &PgPool, token: &str) -> Result<String, ApiError> {
    let row = sqlx::query_as::<_, EmailToken>(
        r#"SELECT email, token, expires FROM verification_tokens WHERE token = $1"#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Err(ApiError::Token("Invalid verification token".into()));
    };

    if row.expires < OffsetDateTime::now_utc() {
        sqlx::query(r#"DELETE FROM verification_tokens WHERE token = $1"#)
            .bind(token)
            .execute(db)
            .await?;
        return Err(ApiError::Token("Verification token has expired".into()));
    }

    let mut tx = db.begin().await.context("begin verification consume")?;
    sqlx::query(r#"UPDATE users SET email_verified = now() WHERE email = $1"#)
        .bind(&row.email)
        .execute(&mut *tx)
        .await
        .context("mark email verified")?;
    sqlx::query(r#"DELETE FROM verification_tokens WHERE token = $1"#)
        .bind(token)
        .execute(&mut *tx)
        .await
        .context("delete verification token")?;
    tx.commit().await.context("commit verification consume")?;

    Ok(row.email)
}

/// Consume a reset token: overwrite the password hash and delete the token in
/// one transaction.
pub async fn consume_reset(db: &PgPool, token: &str, password_hash: &str) -> Result<String, ApiError> {
    let row = sqlx::query_as::<_, EmailToken>(
        r#"SELECT email, token, expires FROM password_reset_tokens WHERE token = $1"#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Err(ApiError::Token("Invalid or expired token".into()));
    };

    if row.expires < OffsetDateTime::now_utc() {
        sqlx::query(r#"DELETE FROM password_reset_tokens WHERE token = $1"#)
            .bind(token)
            .execute(db)
            .await?;
        return Err(ApiError::Token("Token has expired".into()));
    }

    let mut tx = db.begin().await.context("begin reset consume")?;
    sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE email = $1"#)
        .bind(&row.email)
        .bind(password_hash)
        .execute(&mut *tx)
        .await
        .context("update password")?;
    sqlx::query(r#"DELETE FROM password_reset_tokens WHERE token = $1"#)
        .bind(token)
        .execute(&mut *tx)
        .await
        .context("delete reset token")?;
    tx.commit().await.context("commit reset consume")?;

    Ok(row.email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }

    #[test]
    fn validity_windows() {
        assert_eq!(VERIFICATION_TTL.whole_hours(), 24);
        assert_eq!(RESET_TTL.whole_hours(), 1);
    }
}
