use axum::{
    routing::get,
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(handlers::list_blogs).post(handlers::create_blog))
        .route(
            "/blogs/:slug",
            get(handlers::get_blog)
                .patch(handlers::update_blog)
                .delete(handlers::delete_blog),
        )
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
}
