use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    products::{
        dto::{CreateProductRequest, ListQuery, SearchQuery, UpdateProductRequest},
        repo::{NewProduct, Product},
    },
    state::AppState,
    users::dto::MessageResponse,
};

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn validate_amounts(price: Option<f64>, stock: Option<i32>) -> Result<(), (StatusCode, String)> {
    if let Some(p) = price {
        if !p.is_finite() || p < 0.0 {
            return Err((StatusCode::BAD_REQUEST, "Price must be non-negative".into()));
        }
    }
    if let Some(s) = stock {
        if s < 0 {
            return Err((StatusCode::BAD_REQUEST, "Stock must be non-negative".into()));
        }
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Product>>, (StatusCode, String)> {
    let products = Product::list(
        &state.db,
        q.category.as_deref(),
        q.active,
        q.search.as_deref(),
    )
    .await
    .map_err(internal)?;
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>, (StatusCode, String)> {
    let term = q.search.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let products = Product::search(&state.db, term, 10).await.map_err(internal)?;
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, (StatusCode, String)> {
    let product = Product::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;
    Ok(Json(product))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Product name is required".into()));
    }
    validate_amounts(Some(payload.price), Some(payload.stock))?;

    let product = Product::create(
        &state.db,
        NewProduct {
            name: payload.name.trim(),
            description: payload.description.as_deref(),
            price: payload.price,
            category: payload.category.as_deref(),
            stock: payload.stock,
            image_url: payload.image_url.as_deref(),
            image_id: payload.image_id.as_deref(),
            duration_from_days: payload.duration_from_days,
            duration_to_days: payload.duration_to_days,
        },
    )
    .await
    .map_err(internal)?;

    info!(product_id = %product.id, name = %product.name, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, (StatusCode, String)> {
    validate_amounts(payload.price, payload.stock)?;

    let product = Product::update(
        &state.db,
        id,
        payload.name.as_deref(),
        payload.description.as_deref(),
        payload.price,
        payload.category.as_deref(),
        payload.stock,
        payload.is_active,
        payload.image_url.as_deref(),
        payload.image_id.as_deref(),
        payload.duration_from_days,
        payload.duration_to_days,
    )
    .await
    .map_err(internal)?
    .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;

    info!(product_id = %id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let deleted = Product::delete_by_id(&state.db, id).await.map_err(internal)?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Product not found".into()));
    }
    info!(product_id = %id, "product deleted");
    Ok(Json(MessageResponse {
        message: "Product deleted successfully".into(),
    }))
}
