use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::jwt::{AuthUser, Claims},
    error::ApiError,
    state::AppState,
};

/// The single authority for admin capability checks. The role is read fresh
/// from the users table on every call; session claims are never trusted for
/// role decisions.
pub async fn authorize_admin(db: &PgPool, user_id: Uuid) -> Result<(), ApiError> {
    let role = sqlx::query_scalar::<_, String>(r#"SELECT role FROM users WHERE id = $1"#)
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    match role.as_deref() {
        Some("ADMIN") => Ok(()),
        Some(_) => Err(ApiError::forbidden("Forbidden")),
        None => Err(ApiError::unauthorized("Unauthorized")),
    }
}

/// An authenticated user whose ADMIN role has been confirmed against the
/// database. Admin handlers take this instead of [`AuthUser`].
pub struct AdminUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        authorize_admin(&state.db, claims.sub).await?;
        Ok(AdminUser(claims))
    }
}

/// Gate layered onto the /api/admin subtree. Handlers underneath repeat the
/// check through [`AdminUser`]; both paths go through [`authorize_admin`].
pub async fn admin_gate(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize_admin(&state.db, claims.sub).await?;
    Ok(next.run(request).await)
}
