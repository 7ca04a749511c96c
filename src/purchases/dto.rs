use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::{Purchase, PurchaseItem};

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub phone_number: String,
    pub name: String,
    pub village: String,
    pub sn: String,
    pub products: Option<Vec<LineItemRequest>>,
    pub manual_total_amount: Option<f64>,
    pub deposit_amount: Option<f64>,
}

/// `deposit_amount` is an increment on top of the stored deposit, not a
/// replacement.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub deposit_amount: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseDetails {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

/// One row of a bulk import.
#[derive(Debug, Deserialize)]
pub struct BulkRow {
    pub phone_number: String,
    pub customer_name: String,
    pub village: String,
    pub sn: String,
    pub total_amount: f64,
    #[serde(default)]
    pub deposit_amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkRowError {
    pub row: usize,
    pub sn: String,
    pub error: String,
}
