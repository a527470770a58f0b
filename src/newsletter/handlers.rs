use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{dto::MessageResponse, guard::AdminUser, handlers::is_valid_email},
    error::ApiError,
    mailer,
    newsletter::{
        dispatch,
        dto::{
            AddSubscriberRequest, CampaignRequest, NewsletterStatsResponse, SendResponse,
            SubscribeRequest, SubscribeResponse, UnsubscribeQuery,
        },
        repo,
        repo::{Newsletter, Subscriber},
    },
    state::AppState,
};

#[instrument(skip(state, payload))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }

    if let Some(existing) = repo::find_subscriber(&state.db, &email).await? {
        if existing.status == "ACTIVE" {
            return Err(ApiError::validation("Email is already subscribed"));
        }
        let subscriber = repo::reactivate_subscriber(&state.db, &email, None, "WEBSITE")
            .await?
            .ok_or_else(|| ApiError::not_found("Subscription not found"))?;
        info!(email = %email, "newsletter subscription reactivated");
        return Ok((
            StatusCode::OK,
            Json(SubscribeResponse {
                message: "Newsletter subscription reactivated".into(),
                subscriber,
            }),
        ));
    }

    let subscriber = repo::insert_subscriber(&state.db, &email, None, "WEBSITE").await?;
    info!(email = %email, "newsletter subscription created");
    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            message: "Successfully subscribed to newsletter".into(),
            subscriber,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Query(query): Query<UnsubscribeQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::validation("Email is required"))?
        .to_lowercase();

    if !repo::unsubscribe(&state.db, &email).await? {
        return Err(ApiError::not_found("Subscription not found"));
    }

    info!(email = %email, "newsletter unsubscribed");
    Ok(Json(MessageResponse::new(
        "Successfully unsubscribed from newsletter",
    )))
}

#[instrument(skip(state, _admin))]
pub async fn list_campaigns(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Newsletter>>, ApiError> {
    let campaigns = repo::list_campaigns(&state.db).await?;
    Ok(Json(campaigns))
}

#[instrument(skip(state, payload))]
pub async fn create_campaign(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Json(payload): Json<CampaignRequest>,
) -> Result<(StatusCode, Json<Newsletter>), ApiError> {
    if payload.subject.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::validation("Subject and content are required"));
    }

    let campaign = repo::insert_campaign(
        &state.db,
        payload.subject.trim(),
        &payload.content,
        payload.scheduled_for,
        claims.sub,
    )
    .await?;

    info!(campaign_id = %campaign.id, status = %campaign.status, "campaign created");
    Ok((StatusCode::CREATED, Json(campaign)))
}

#[instrument(skip(state, _admin))]
pub async fn get_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Newsletter>, ApiError> {
    let campaign = repo::find_campaign(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Newsletter not found"))?;
    Ok(Json(campaign))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CampaignRequest>,
) -> Result<Json<Newsletter>, ApiError> {
    if payload.subject.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::validation("Subject and content are required"));
    }

    let campaign = repo::update_campaign(
        &state.db,
        id,
        payload.subject.trim(),
        &payload.content,
        payload.scheduled_for,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Newsletter not found"))?;

    info!(campaign_id = %campaign.id, "campaign updated");
    Ok(Json(campaign))
}

#[instrument(skip(state, _admin))]
pub async fn delete_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !repo::delete_campaign(&state.db, id).await? {
        return Err(ApiError::not_found("Newsletter not found"));
    }
    info!(campaign_id = %id, "campaign deleted");
    Ok(Json(MessageResponse::new("Newsletter deleted successfully")))
}

#[instrument(skip(state, _admin))]
pub async fn send_campaign(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SendResponse>, ApiError> {
    let campaign = repo::find_campaign(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Newsletter not found"))?;

    let recipients = repo::active_subscriber_emails(&state.db).await?;
    if recipients.is_empty() {
        return Err(ApiError::validation("No active subscribers found"));
    }

    let recipient_count = recipients.len();
    let report = dispatch::dispatch_campaign(
        state.mailer.clone(),
        &campaign.subject,
        &campaign.content,
        recipients,
    )
    .await;

    let newsletter = repo::mark_sent(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Newsletter not found"))?;

    info!(
        campaign_id = %id,
        recipients = recipient_count,
        sent = report.sent,
        failed = report.failed,
        "campaign dispatched"
    );
    Ok(Json(SendResponse { newsletter, report }))
}

#[instrument(skip(state, _admin))]
pub async fn list_subscribers(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Subscriber>>, ApiError> {
    let subscribers = repo::recent_subscribers(&state.db, 100).await?;
    Ok(Json(subscribers))
}

#[instrument(skip(state, _admin, payload))]
pub async fn add_subscriber(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<AddSubscriberRequest>,
) -> Result<(StatusCode, Json<Subscriber>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email address"));
    }

    if let Some(existing) = repo::find_subscriber(&state.db, &email).await? {
        if existing.status == "ACTIVE" {
            return Err(ApiError::validation("Email is already subscribed"));
        }
        let subscriber = repo::reactivate_subscriber(
            &state.db,
            &email,
            payload.name.as_deref(),
            &payload.source,
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription not found"))?;

        let (subject, html) = mailer::welcome_back_email();
        state
            .mailer
            .send(&email, &subject, &html)
            .await
            .map_err(|e| {
                error!(error = %e, email = %email, "failed to send welcome-back email");
                ApiError::Internal(e)
            })?;

        info!(email = %email, "subscriber reactivated by admin");
        return Ok((StatusCode::OK, Json(subscriber)));
    }

    let subscriber =
        repo::insert_subscriber(&state.db, &email, payload.name.as_deref(), &payload.source)
            .await?;

    let (subject, html) = mailer::welcome_email();
    state
        .mailer
        .send(&email, &subject, &html)
        .await
        .map_err(|e| {
            error!(error = %e, email = %email, "failed to send welcome email");
            ApiError::Internal(e)
        })?;

    info!(email = %email, source = %subscriber.source, "subscriber added by admin");
    Ok((StatusCode::CREATED, Json(subscriber)))
}

#[instrument(skip(state, _admin))]
pub async fn newsletter_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<NewsletterStatsResponse>, ApiError> {
    let stats = repo::campaign_stats(&state.db).await?;
    Ok(Json(NewsletterStatsResponse {
        total_sent: stats.total_sent,
        average_open_rate: stats.average_open_rate,
        average_click_rate: stats.average_click_rate,
        total_subscribers: stats.total_subscribers,
    }))
}
