use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub mod dto;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod oauth;
pub mod password;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/verify", post(handlers::verify_email))
        .route("/auth/send-verification", post(handlers::send_verification))
        .route("/auth/reset-password", post(handlers::reset_password))
        .route("/auth/new-password", post(handlers::new_password))
        .route("/auth/oauth/google", get(handlers::oauth_google))
        .route("/auth/oauth/callback", post(handlers::oauth_callback))
}
