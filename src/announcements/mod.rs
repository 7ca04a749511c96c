pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_announcements))
        .route("/broadcast", post(handlers::broadcast))
        .route("/payment-reminders", post(handlers::payment_reminders))
        .route("/:id", delete(handlers::delete_announcement))
}
