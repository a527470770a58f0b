use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, NewPasswordRequest,
            OAuthCallbackRequest, OAuthUrlResponse, PublicUser, RegisterRequest,
            ResetPasswordRequest, SendVerificationRequest, VerifyRequest,
        },
        jwt::JwtKeys,
        oauth, password, tokens,
    },
    error::ApiError,
    mailer,
    state::AppState,
    users::repo::{NewUser, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

async fn send_verification_mail(state: &AppState, to: &str, token: &str) -> Result<(), ApiError> {
    let (subject, html) = mailer::verification_email(&state.config.public_base_url, token);
    state.mailer.send(to, &subject, &html).await.map_err(|e| {
        error!(error = %e, email = %to, "failed to send verification email");
        ApiError::EmailDelivery(
            "Account created but failed to send verification email. \
             Please try logging in to resend the verification email."
                .into(),
        )
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();

    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Name, email and password are required"));
    }
    if name.len() < 2 {
        return Err(ApiError::validation("Name must be at least 2 characters long"));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    if let Some(existing) = User::find_by_email(&state.db, &email).await? {
        if existing.email_verified.is_some() {
            warn!(email = %email, "registration attempt for existing account");
            return Err(ApiError::validation("User with this email already exists"));
        }
        // Unverified re-registration: replace the live token and resend.
        let token = tokens::issue_verification(&state.db, &email).await?;
        send_verification_mail(&state, &email, &token).await?;
        return Ok((
            StatusCode::OK,
            Json(MessageResponse::new("Verification email sent")),
        ));
    }

    let hash = password::hash_password(&payload.password)?;
    let user = User::insert(
        &state.db,
        NewUser {
            name: Some(name),
            email: email.clone(),
            password_hash: Some(hash),
            role: "USER".into(),
            image: None,
            email_verified: None,
        },
    )
    .await?;

    let token = tokens::issue_verification(&state.db, &email).await?;
    send_verification_mail(&state, &email, &token).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Please check your email to verify your account",
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login unknown email");
            ApiError::unauthorized("Invalid email or password")
        })?;

    let Some(hash) = user.password_hash.as_deref() else {
        warn!(email = %email, "credential login for passwordless account");
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    // Verification is checked before the password comparison result is
    // revealed, so unverified accounts always see the same error.
    if user.email_verified.is_none() {
        warn!(email = %email, "login before email verification");
        return Err(ApiError::unauthorized(
            "Please verify your email before logging in",
        ));
    }

    if !password::verify_password(&payload.password, hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(&user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.token.is_empty() {
        return Err(ApiError::validation("Verification token is required"));
    }

    let email = tokens::consume_verification(&state.db, &payload.token).await?;
    info!(email = %email, "email verified");
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

#[instrument(skip(state, payload))]
pub async fn send_verification(
    State(state): State<AppState>,
    Json(payload): Json<SendVerificationRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let token = tokens::issue_verification(&state.db, &user.email).await?;
    send_verification_mail(&state, &user.email, &token).await?;

    Ok(Json(MessageResponse::new(
        "Verification email sent successfully",
    )))
}

const RESET_REQUEST_MESSAGE: &str =
    "If an account exists with this email, you will receive a password reset link";

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    // The response is identical whether or not the account exists, so the
    // endpoint cannot be used to enumerate registered addresses.
    if let Some(user) = User::find_by_email(&state.db, &email).await? {
        let token = tokens::issue_reset(&state.db, &user.email).await?;
        let (subject, html) =
            mailer::password_reset_email(&state.config.public_base_url, &token);
        state
            .mailer
            .send(&user.email, &subject, &html)
            .await
            .map_err(|e| {
                error!(error = %e, email = %user.email, "failed to send reset email");
                ApiError::Internal(e)
            })?;
        info!(user_id = %user.id, "password reset requested");
    }

    Ok(Json(MessageResponse::new(RESET_REQUEST_MESSAGE)))
}

#[instrument(skip(state, payload))]
pub async fn new_password(
    State(state): State<AppState>,
    Json(payload): Json<NewPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.token.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Token and password are required"));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    let hash = password::hash_password(&payload.password)?;
    let email = tokens::consume_reset(&state.db, &payload.token, &hash).await?;

    info!(email = %email, "password reset completed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

#[instrument(skip(state))]
pub async fn oauth_google(
    State(state): State<AppState>,
) -> Result<Json<OAuthUrlResponse>, ApiError> {
    let cfg = &state.config.oauth;
    if cfg.google_client_id.is_empty() {
        return Err(ApiError::Internal(anyhow::anyhow!(
            "GOOGLE_CLIENT_ID not configured"
        )));
    }
    Ok(Json(OAuthUrlResponse {
        url: oauth::authorize_url(cfg),
    }))
}

#[instrument(skip(state, payload))]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Json(payload): Json<OAuthCallbackRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.code.is_empty() {
        return Err(ApiError::validation("Authorization code is required"));
    }

    let identity = oauth::resolve_identity(&state.config.oauth, &payload.code).await?;
    let email = identity.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::validation("OAuth provider returned no usable email"));
    }

    // The provider attested ownership of the address, so a first sign-in
    // creates a verified account and an existing unverified credential
    // account becomes verified.
    let user = match User::find_by_email(&state.db, &email).await? {
        Some(_) => {
            User::link_oauth(
                &state.db,
                &email,
                identity.name.as_deref(),
                identity.picture.as_deref(),
            )
            .await?
        }
        None => {
            User::insert(
                &state.db,
                NewUser {
                    name: identity.name.clone(),
                    email: email.clone(),
                    password_hash: None,
                    role: "USER".into(),
                    image: identity.picture.clone(),
                    email_verified: Some(OffsetDateTime::now_utc()),
                },
            )
            .await?
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(&user)?;

    info!(user_id = %user.id, provider_sub = %identity.sub, "oauth sign-in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@sub.example.co.uk"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user @example.com"));
    }

    #[test]
    fn message_response_serialization() {
        let json = serde_json::to_string(&MessageResponse::new("Email verified successfully"))
            .expect("serialize");
        assert!(json.contains("Email verified successfully"));
        assert!(json.contains("message"));
    }

    #[test]
    fn reset_request_message_is_account_agnostic() {
        assert!(!RESET_REQUEST_MESSAGE.contains("not"));
        assert!(RESET_REQUEST_MESSAGE.starts_with("If an account exists"));
    }
}
