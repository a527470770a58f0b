use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::MessageResponse,
        guard::AdminUser,
        handlers::is_valid_email,
        jwt::AuthUser,
        password,
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{
            AdminUserResponse, CreateUserRequest, ProfileResponse, SettingsRequest,
            SettingsResponse, UpdateProfileRequest, UpdateUserRequest,
        },
        repo::{NewUser, User},
    },
};

fn valid_role(role: &str) -> bool {
    matches!(role, "USER" | "ADMIN")
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<AdminUserResponse>>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(AdminUserResponse::from).collect()))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<AdminUserResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();

    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Name, email and password are required"));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    if !valid_role(&payload.role) {
        return Err(ApiError::validation("Role must be USER or ADMIN"));
    }
    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".into()));
    }

    let hash = password::hash_password(&payload.password)?;
    // Admin-created accounts skip the verification email round-trip.
    let user = User::insert(
        &state.db,
        NewUser {
            name: Some(name),
            email,
            password_hash: Some(hash),
            role: payload.role,
            image: None,
            email_verified: Some(time::OffsetDateTime::now_utc()),
        },
    )
    .await?;

    info!(user_id = %user.id, role = %user.role, "user created by admin");
    Ok((StatusCode::CREATED, Json(AdminUserResponse::from(user))))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminUserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(AdminUserResponse::from(user)))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<AdminUserResponse>, ApiError> {
    if let Some(role) = payload.role.as_deref() {
        if !valid_role(role) {
            return Err(ApiError::validation("Role must be USER or ADMIN"));
        }
    }
    if let Some(email) = payload.email.as_deref() {
        if !is_valid_email(email) {
            return Err(ApiError::validation("Invalid email format"));
        }
    }

    let hash = match payload.password.as_deref() {
        Some(p) if !p.is_empty() => Some(password::hash_password(p)?),
        _ => None,
    };

    let user = User::admin_update(
        &state.db,
        id,
        payload.name.as_deref(),
        payload.email.as_deref(),
        hash.as_deref(),
        payload.role.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %user.id, "user updated by admin");
    Ok(Json(AdminUserResponse::from(user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if id == claims.sub {
        warn!(user_id = %id, "admin attempted self-deletion");
        return Err(ApiError::validation("Cannot delete your own account"));
    }

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = %id, deleted_by = %claims.sub, "user deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let name = payload.name.trim();
    if name.len() < 2 {
        return Err(ApiError::validation("Name must be at least 2 characters long"));
    }

    let user = User::update_name(&state.db, claims.sub, name)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    Ok(Json(ProfileResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        image: user.image,
    }))
}

#[instrument(skip(_claims, payload))]
pub async fn update_settings(
    AuthUser(_claims): AuthUser,
    Json(payload): Json<SettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    // Preferences live client-side; the endpoint only acknowledges them.
    let _ = payload;
    Ok(Json(SettingsResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_validation() {
        assert!(valid_role("USER"));
        assert!(valid_role("ADMIN"));
        assert!(!valid_role("admin"));
        assert!(!valid_role("SUPERUSER"));
    }
}
