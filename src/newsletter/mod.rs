use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{auth::guard, state::AppState};

pub mod dispatch;
pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route(
            "/admin/newsletter",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route("/admin/newsletter/stats", get(handlers::newsletter_stats))
        .route(
            "/admin/newsletter/subscribers",
            get(handlers::list_subscribers).post(handlers::add_subscriber),
        )
        .route(
            "/admin/newsletter/:id",
            get(handlers::get_campaign)
                .patch(handlers::update_campaign)
                .delete(handlers::delete_campaign),
        )
        .route("/admin/newsletter/:id/send", post(handlers::send_campaign))
        .layer(middleware::from_fn_with_state(state, guard::admin_gate));

    Router::new()
        .route(
            "/newsletter",
            post(handlers::subscribe).delete(handlers::unsubscribe),
        )
        .merge(admin)
}
