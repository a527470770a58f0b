use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use crate::{auth::guard, state::AppState};

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route(
            "/admin/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/admin/users/:id",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .layer(middleware::from_fn_with_state(state, guard::admin_gate));

    Router::new()
        .route("/user/profile", patch(handlers::update_profile))
        .route("/user/settings", patch(handlers::update_settings))
        .merge(admin)
}
