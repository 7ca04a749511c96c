use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    announcements::{
        dto::{BroadcastRequest, DeliveryResponse},
        repo::{self, Announcement},
        services,
    },
    auth::extractors::AdminUser,
    messages,
    state::AppState,
    users::{dto::MessageResponse, repo::User, services::is_valid_role},
};

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[instrument(skip(state, admin, payload))]
pub async fn broadcast(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<BroadcastRequest>,
) -> Result<Json<DeliveryResponse>, (StatusCode, String)> {
    if payload.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message content is required".into()));
    }
    if let Some(role) = &payload.target_role {
        if !is_valid_role(role) {
            return Err((StatusCode::BAD_REQUEST, "Invalid role".into()));
        }
    }

    let users = User::list_by_role(&state.db, payload.target_role.as_deref())
        .await
        .map_err(internal)?;
    if users.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            "No users found to send announcement".into(),
        ));
    }

    let body = messages::announcement(
        &state.config,
        payload.message.trim(),
        payload.message_hindi.as_deref(),
    );
    let stats = services::broadcast_to_users(&state, &users, &body).await;

    Announcement::create(
        &state.db,
        payload.message.trim(),
        payload.message_hindi.as_deref(),
        payload.target_role.as_deref(),
        admin.id,
    )
    .await
    .map_err(internal)?;

    info!(
        total = stats.total_users,
        sent = stats.messages_sent,
        failed = stats.messages_failed,
        "announcement broadcast"
    );
    Ok(Json(DeliveryResponse {
        message: "Announcement broadcast initiated".into(),
        stats,
    }))
}

#[instrument(skip(state))]
pub async fn payment_reminders(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<DeliveryResponse>, (StatusCode, String)> {
    let rows = repo::list_pending_with_users(&state.db)
        .await
        .map_err(internal)?;
    if rows.is_empty() {
        return Err((StatusCode::NOT_FOUND, "No pending payments found".into()));
    }

    let stats = services::deliver_reminders(&state, rows).await;

    info!(
        total = stats.total_users,
        sent = stats.messages_sent,
        failed = stats.messages_failed,
        "payment reminders sent"
    );
    Ok(Json(DeliveryResponse {
        message: "Payment reminders sent".into(),
        stats,
    }))
}

#[instrument(skip(state))]
pub async fn list_announcements(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<Announcement>>, (StatusCode, String)> {
    let rows = Announcement::list_all(&state.db).await.map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let deleted = Announcement::delete_by_id(&state.db, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Announcement not found".into()));
    }
    info!(announcement_id = %id, "announcement deleted");
    Ok(Json(MessageResponse {
        message: "Announcement deleted successfully".into(),
    }))
}
