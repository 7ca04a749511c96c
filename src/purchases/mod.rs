pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        .route("/user", get(handlers::my_purchases))
        .route("/bulk-upload", post(handlers::bulk_upload))
        .route("/:id/status", patch(handlers::update_status))
}
