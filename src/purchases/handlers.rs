use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    purchases::{
        dto::{BulkRow, CreatePurchaseRequest, PurchaseDetails, UpdateStatusRequest},
        repo::Purchase,
        services::{self, BulkReport, PurchaseError},
    },
    state::AppState,
};

fn error_response(e: PurchaseError) -> (StatusCode, String) {
    match e {
        PurchaseError::MissingFields
        | PurchaseError::NothingToCharge
        | PurchaseError::InvalidAmount
        | PurchaseError::DepositExceedsTotal
        | PurchaseError::InvalidStatus
        | PurchaseError::InvalidRow(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        PurchaseError::ProductNotFound(_) | PurchaseError::NotFound => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        PurchaseError::Db(inner) => {
            error!(error = %inner, "purchase operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, inner.to_string())
        }
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[instrument(skip(state, payload))]
pub async fn create_purchase(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseDetails>), (StatusCode, String)> {
    let (purchase, items) = services::create_purchase(&state, &payload)
        .await
        .map_err(error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(PurchaseDetails { purchase, items }),
    ))
}

#[instrument(skip(state))]
pub async fn list_purchases(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<PurchaseDetails>>, (StatusCode, String)> {
    let purchases = Purchase::list_all(&state.db).await.map_err(internal)?;
    let details = services::with_items(&state, purchases)
        .await
        .map_err(internal)?;
    Ok(Json(details))
}

#[instrument(skip(state, user))]
pub async fn my_purchases(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<PurchaseDetails>>, (StatusCode, String)> {
    let purchases = Purchase::list_by_user(&state.db, user.id)
        .await
        .map_err(internal)?;
    let details = services::with_items(&state, purchases)
        .await
        .map_err(internal)?;
    Ok(Json(details))
}

#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Purchase>, (StatusCode, String)> {
    let purchase = services::update_payment(
        &state,
        id,
        payload.deposit_amount,
        payload.status.as_deref(),
    )
    .await
    .map_err(error_response)?;
    Ok(Json(purchase))
}

#[instrument(skip(state, rows))]
pub async fn bulk_upload(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(rows): Json<Vec<BulkRow>>,
) -> Result<Json<BulkReport>, (StatusCode, String)> {
    if rows.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No rows to import".into()));
    }
    let report = services::import_rows(&state, &rows).await;
    Ok(Json(report))
}
