use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{auth::guard, auth::guard::AdminUser, error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct SiteStatsResponse {
    pub total_users: i64,
    pub total_blogs: i64,
    pub total_subscribers: i64,
    /// Accounts created within the last 7 days.
    pub new_users: i64,
}

#[instrument(skip(state, _admin))]
async fn site_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<SiteStatsResponse>, ApiError> {
    let total_users = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM users"#)
        .fetch_one(&state.db)
        .await?;
    let total_blogs = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM blogs"#)
        .fetch_one(&state.db)
        .await?;
    let total_subscribers =
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM newsletter_subscribers"#)
            .fetch_one(&state.db)
            .await?;
    let new_users = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM users WHERE created_at >= now() - interval '7 days'"#,
    )
    .fetch_one(&state.db)
    .await?;

    Ok(Json(SiteStatsResponse {
        total_users,
        total_blogs,
        total_subscribers,
        new_users,
    }))
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(site_stats))
        .layer(middleware::from_fn_with_state(state, guard::admin_gate))
}
