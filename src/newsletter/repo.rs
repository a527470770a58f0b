use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// A campaign. Status is DRAFT, SCHEDULED or SENT.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Newsletter {
    pub id: Uuid,
    pub subject: String,
    pub content: String,
    pub status: String,
    pub scheduled_for: Option<OffsetDateTime>,
    pub sent_at: Option<OffsetDateTime>,
    pub open_rate: Option<f64>,
    pub click_rate: Option<f64>,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Status is ACTIVE or UNSUBSCRIBED; unsubscribes are soft.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub status: String,
    pub source: String,
    pub subscribed_at: OffsetDateTime,
}

const NEWSLETTER_COLUMNS: &str =
    "id, subject, content, status, scheduled_for, sent_at, open_rate, click_rate, user_id, created_at";

pub async fn list_campaigns(db: &PgPool) -> anyhow::Result<Vec<Newsletter>> {
    let sql = format!("SELECT {NEWSLETTER_COLUMNS} FROM newsletters ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Newsletter>(&sql).fetch_all(db).await?;
    Ok(rows)
}

pub async fn find_campaign(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Newsletter>> {
    let sql = format!("SELECT {NEWSLETTER_COLUMNS} FROM newsletters WHERE id = $1");
    let row = sqlx::query_as::<_, Newsletter>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Status falls out of the schedule: a scheduled_for makes it SCHEDULED,
/// otherwise it stays DRAFT.
pub async fn insert_campaign(
    db: &PgPool,
    subject: &str,
    content: &str,
    scheduled_for: Option<OffsetDateTime>,
    user_id: Uuid,
) -> anyhow::Result<Newsletter> {
    let sql = format!(
        r#"
        INSERT INTO newsletters (subject, content, scheduled_for, status, user_id)
        VALUES ($1, $2, $3, CASE WHEN $3 IS NULL THEN 'DRAFT' ELSE 'SCHEDULED' END, $4)
        RETURNING {NEWSLETTER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Newsletter>(&sql)
        .bind(subject)
        .bind(content)
        .bind(scheduled_for)
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn update_campaign(
    db: &PgPool,
    id: Uuid,
    subject: &str,
    content: &str,
    scheduled_for: Option<OffsetDateTime>,
) -> anyhow::Result<Option<Newsletter>> {
    let sql = format!(
        r#"
        UPDATE newsletters
        SET subject = $2,
            content = $3,
            scheduled_for = $4,
            status = CASE WHEN $4 IS NULL THEN 'DRAFT' ELSE 'SCHEDULED' END
        WHERE id = $1
        RETURNING {NEWSLETTER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Newsletter>(&sql)
        .bind(id)
        .bind(subject)
        .bind(content)
        .bind(scheduled_for)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn delete_campaign(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM newsletters WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_sent(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Newsletter>> {
    let sql = format!(
        r#"
        UPDATE newsletters
        SET status = 'SENT', sent_at = now()
        WHERE id = $1
        RETURNING {NEWSLETTER_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, Newsletter>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_subscriber(db: &PgPool, email: &str) -> anyhow::Result<Option<Subscriber>> {
    let row = sqlx::query_as::<_, Subscriber>(
        r#"
        SELECT id, email, name, status, source, subscribed_at
        FROM newsletter_subscribers
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert_subscriber(
    db: &PgPool,
    email: &str,
    name: Option<&str>,
    source: &str,
) -> anyhow::Result<Subscriber> {
    let row = sqlx::query_as::<_, Subscriber>(
        r#"
        INSERT INTO newsletter_subscribers (email, name, source)
        VALUES ($1, $2, $3)
        RETURNING id, email, name, status, source, subscribed_at
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(source)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Flip an unsubscribed record back to ACTIVE, keeping the existing name
/// unless a new one is supplied.
pub async fn reactivate_subscriber(
    db: &PgPool,
    email: &str,
    name: Option<&str>,
    source: &str,
) -> anyhow::Result<Option<Subscriber>> {
    let row = sqlx::query_as::<_, Subscriber>(
        r#"
        UPDATE newsletter_subscribers
        SET status = 'ACTIVE', name = COALESCE($2, name), source = $3
        WHERE email = $1
        RETURNING id, email, name, status, source, subscribed_at
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(source)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn unsubscribe(db: &PgPool, email: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"UPDATE newsletter_subscribers SET status = 'UNSUBSCRIBED' WHERE email = $1"#,
    )
    .bind(email)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn recent_subscribers(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Subscriber>> {
    let rows = sqlx::query_as::<_, Subscriber>(
        r#"
        SELECT id, email, name, status, source, subscribed_at
        FROM newsletter_subscribers
        ORDER BY subscribed_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn active_subscriber_emails(db: &PgPool) -> anyhow::Result<Vec<String>> {
    let emails = sqlx::query_scalar::<_, String>(
        r#"SELECT email FROM newsletter_subscribers WHERE status = 'ACTIVE'"#,
    )
    .fetch_all(db)
    .await?;
    Ok(emails)
}

pub struct CampaignStats {
    pub total_sent: i64,
    pub average_open_rate: f64,
    pub average_click_rate: f64,
    pub total_subscribers: i64,
}

pub async fn campaign_stats(db: &PgPool) -> anyhow::Result<CampaignStats> {
    let total_sent = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM newsletters WHERE status = 'SENT'"#,
    )
    .fetch_one(db)
    .await?;
    let average_open_rate = sqlx::query_scalar::<_, Option<f64>>(
        r#"SELECT AVG(open_rate) FROM newsletters WHERE status = 'SENT' AND open_rate IS NOT NULL"#,
    )
    .fetch_one(db)
    .await?
    .unwrap_or(0.0);
    let average_click_rate = sqlx::query_scalar::<_, Option<f64>>(
        r#"SELECT AVG(click_rate) FROM newsletters WHERE status = 'SENT' AND click_rate IS NOT NULL"#,
    )
    .fetch_one(db)
    .await?
    .unwrap_or(0.0);
    let total_subscribers = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM newsletter_subscribers WHERE status = 'ACTIVE'"#,
    )
    .fetch_one(db)
    .await?;

    Ok(CampaignStats {
        total_sent,
        average_open_rate,
        average_click_rate,
        total_subscribers,
    })
}
