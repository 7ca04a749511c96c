pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/admin/login", post(handlers::admin_login))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password))
        .route(
            "/profile",
            get(handlers::get_profile).patch(handlers::update_profile),
        )
        .route("/", get(handlers::list_users))
        .route("/:id", delete(handlers::remove_user))
        .route("/:id/role", patch(handlers::update_role))
}
