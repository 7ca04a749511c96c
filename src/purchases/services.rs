use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::messages::{self, ItemLine};
use crate::notify::is_valid_phone;
use crate::products::repo::Product;
use crate::state::AppState;
use crate::users::repo::{NewUser, User, ROLE_FARMER};
use crate::users::services::default_password;

use super::dto::{BulkRow, BulkRowError, CreatePurchaseRequest, PurchaseDetails};
use super::repo::{NewItem, NewPurchase, Purchase, PurchaseItem};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("Phone number, name, village, and SN are required")]
    MissingFields,
    #[error("Either products or manual total amount must be provided")]
    NothingToCharge,
    #[error("Amounts must be non-negative")]
    InvalidAmount,
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),
    #[error("Purchase not found")]
    NotFound,
    #[error("Total deposit amount cannot be greater than total amount")]
    DepositExceedsTotal,
    #[error("Invalid payment status")]
    InvalidStatus,
    #[error("{0}")]
    InvalidRow(String),
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

/// Payment fields derived from the total and the cumulative deposit.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentState {
    pub deposit: f64,
    pub remaining: f64,
    pub status: &'static str,
}

/// The status is never stored directly by callers; it always follows the
/// remaining amount.
pub fn derive_payment(total: f64, deposit: f64) -> PaymentState {
    let remaining = total - deposit;
    PaymentState {
        deposit,
        remaining,
        status: if remaining <= 0.0 {
            STATUS_COMPLETED
        } else {
            STATUS_PENDING
        },
    }
}

/// Add a deposit increment on top of the stored deposit. The increment may
/// never push the cumulative deposit past the total, and deposits never
/// shrink. A manual status value is validated but the persisted status
/// always follows the remaining amount, so a completed purchase cannot be
/// reverted to pending and completion cannot be forced while money is owed.
pub fn apply_deposit(
    total: f64,
    current_deposit: f64,
    increment: f64,
    manual_status: Option<&str>,
) -> Result<PaymentState, PurchaseError> {
    if !increment.is_finite() || increment < 0.0 {
        return Err(PurchaseError::InvalidAmount);
    }
    let new_deposit = current_deposit + increment;
    if new_deposit > total {
        return Err(PurchaseError::DepositExceedsTotal);
    }

    let state = derive_payment(total, new_deposit);
    if let Some(status) = manual_status {
        if status != STATUS_PENDING && status != STATUS_COMPLETED {
            return Err(PurchaseError::InvalidStatus);
        }
    }
    Ok(state)
}

pub fn validate_create(req: &CreatePurchaseRequest) -> Result<(), PurchaseError> {
    if req.phone_number.trim().is_empty()
        || req.name.trim().is_empty()
        || req.village.trim().is_empty()
        || req.sn.trim().is_empty()
    {
        return Err(PurchaseError::MissingFields);
    }
    let has_products = req.products.as_ref().map(|p| !p.is_empty()).unwrap_or(false);
    if !has_products && req.manual_total_amount.is_none() {
        return Err(PurchaseError::NothingToCharge);
    }
    if let Some(total) = req.manual_total_amount {
        if !total.is_finite() || total < 0.0 {
            return Err(PurchaseError::InvalidAmount);
        }
    }
    let deposit = req.deposit_amount.unwrap_or(0.0);
    if !deposit.is_finite() || deposit < 0.0 {
        return Err(PurchaseError::InvalidAmount);
    }
    if let Some(products) = &req.products {
        if products.iter().any(|p| p.quantity <= 0) {
            return Err(PurchaseError::InvalidAmount);
        }
    }
    Ok(())
}

/// Look up the customer by phone number, creating a farmer account with the
/// derived default password when none exists yet.
pub async fn find_or_create_user(
    state: &AppState,
    phone_number: &str,
    name: &str,
    village: &str,
) -> anyhow::Result<User> {
    if let Some(user) = User::find_by_phone(&state.db, phone_number).await? {
        return Ok(user);
    }

    let hash = hash_password(&default_password(phone_number))?;
    let village = village.trim().to_lowercase();
    let user = User::create(
        &state.db,
        NewUser {
            phone_number,
            password_hash: &hash,
            name,
            village: Some(village.as_str()),
            role: ROLE_FARMER,
            language_preference: "en",
            must_reset_password: true,
        },
    )
    .await?;
    info!(user_id = %user.id, phone = %phone_number, "user created implicitly for purchase");
    Ok(user)
}

pub async fn create_purchase(
    state: &AppState,
    req: &CreatePurchaseRequest,
) -> Result<(Purchase, Vec<PurchaseItem>), PurchaseError> {
    validate_create(req)?;

    let user = find_or_create_user(state, &req.phone_number, &req.name, &req.village).await?;

    // Snapshot current catalog prices; any missing product fails the whole
    // operation before the purchase is written.
    let mut items = Vec::new();
    if let Some(products) = &req.products {
        for line in products {
            let product = Product::find_by_id(&state.db, line.product_id)
                .await?
                .ok_or(PurchaseError::ProductNotFound(line.product_id))?;
            items.push(NewItem {
                product_id: Some(product.id),
                product_name: product.name,
                quantity: line.quantity,
                price_at_purchase: product.price,
            });
        }
    }

    let total = req.manual_total_amount.unwrap_or_else(|| {
        items
            .iter()
            .map(|i| i.price_at_purchase * f64::from(i.quantity))
            .sum()
    });
    let deposit = req.deposit_amount.unwrap_or(0.0);
    let payment = derive_payment(total, deposit);

    let (purchase, saved_items) = Purchase::insert_with_items(
        &state.db,
        NewPurchase {
            user_id: Some(user.id),
            sn: req.sn.trim(),
            phone_number: &req.phone_number,
            name: &req.name,
            village: &req.village,
            manual_total_amount: req.manual_total_amount,
            total_amount: total,
            deposit_amount: payment.deposit,
            remaining_amount: payment.remaining,
            payment_status: payment.status,
        },
        &items,
    )
    .await?;

    let item_lines: Vec<ItemLine> = saved_items
        .iter()
        .map(|i| ItemLine {
            name: i.product_name.clone(),
            quantity: i.quantity,
        })
        .collect();
    let body = messages::purchase_confirmation(
        &state.config,
        &purchase.sn,
        &item_lines,
        purchase.total_amount,
        purchase.deposit_amount,
        purchase.remaining_amount,
    );
    if let Err(e) = state.notifier.send(&user.phone_number, &body).await {
        error!(error = %e, purchase_id = %purchase.id, "purchase confirmation not delivered");
    }

    info!(purchase_id = %purchase.id, sn = %purchase.sn, "purchase created");
    Ok((purchase, saved_items))
}

pub async fn update_payment(
    state: &AppState,
    id: Uuid,
    deposit_increment: Option<f64>,
    manual_status: Option<&str>,
) -> Result<Purchase, PurchaseError> {
    let purchase = Purchase::find_by_id(&state.db, id)
        .await?
        .ok_or(PurchaseError::NotFound)?;

    let increment = deposit_increment.unwrap_or(0.0);
    let payment = apply_deposit(
        purchase.total_amount,
        purchase.deposit_amount,
        increment,
        manual_status,
    )?;

    let updated = Purchase::update_payment(
        &state.db,
        id,
        payment.deposit,
        payment.remaining,
        payment.status,
    )
    .await?;

    if let Some(user_id) = updated.user_id {
        match User::find_by_id(&state.db, user_id).await {
            Ok(Some(user)) => {
                let body = messages::payment_update(
                    &state.config,
                    &updated.sn,
                    &updated.payment_status,
                    purchase.deposit_amount,
                    increment,
                    updated.deposit_amount,
                    updated.remaining_amount,
                );
                if let Err(e) = state.notifier.send(&user.phone_number, &body).await {
                    error!(error = %e, purchase_id = %id, "payment update not delivered");
                }
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, purchase_id = %id, "user lookup for notification failed"),
        }
    }

    info!(purchase_id = %id, deposit = increment, status = %updated.payment_status, "payment updated");
    Ok(updated)
}

pub fn validate_row(row: &BulkRow) -> Result<(), String> {
    if row.phone_number.trim().is_empty()
        || row.customer_name.trim().is_empty()
        || row.village.trim().is_empty()
        || row.sn.trim().is_empty()
    {
        return Err("Phone number, customer name, village, and SN are required".into());
    }
    if !is_valid_phone(&row.phone_number) {
        return Err(format!("Invalid phone number: {}", row.phone_number));
    }
    if !row.total_amount.is_finite() || row.total_amount < 0.0 {
        return Err("Total amount must be non-negative".into());
    }
    if !row.deposit_amount.is_finite() || row.deposit_amount < 0.0 {
        return Err("Deposit amount must be non-negative".into());
    }
    if row.deposit_amount > row.total_amount {
        return Err("Deposit amount cannot exceed total amount".into());
    }
    Ok(())
}

/// Outcome of a bulk import; rows are independent and one failure never
/// aborts the rest.
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<BulkRowError>,
}

pub async fn import_rows(state: &AppState, rows: &[BulkRow]) -> BulkReport {
    let mut report = BulkReport {
        succeeded: 0,
        failed: 0,
        errors: Vec::new(),
    };

    for (idx, row) in rows.iter().enumerate() {
        match import_row(state, row).await {
            Ok(purchase) => {
                info!(row = idx + 1, purchase_id = %purchase.id, "bulk row imported");
                report.succeeded += 1;
            }
            Err(e) => {
                error!(row = idx + 1, error = %e, "bulk row failed");
                report.failed += 1;
                report.errors.push(BulkRowError {
                    row: idx + 1,
                    sn: row.sn.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    report
}

async fn import_row(state: &AppState, row: &BulkRow) -> Result<Purchase, PurchaseError> {
    validate_row(row).map_err(PurchaseError::InvalidRow)?;

    let user = find_or_create_user(state, &row.phone_number, &row.customer_name, &row.village).await?;
    let payment = derive_payment(row.total_amount, row.deposit_amount);

    let (purchase, _) = Purchase::insert_with_items(
        &state.db,
        NewPurchase {
            user_id: Some(user.id),
            sn: row.sn.trim(),
            phone_number: &row.phone_number,
            name: &row.customer_name,
            village: &row.village,
            manual_total_amount: Some(row.total_amount),
            total_amount: row.total_amount,
            deposit_amount: payment.deposit,
            remaining_amount: payment.remaining,
            payment_status: payment.status,
        },
        &[],
    )
    .await?;

    let body = messages::purchase_confirmation(
        &state.config,
        &purchase.sn,
        &[],
        purchase.total_amount,
        purchase.deposit_amount,
        purchase.remaining_amount,
    );
    if let Err(e) = state.notifier.send(&user.phone_number, &body).await {
        error!(error = %e, purchase_id = %purchase.id, "bulk confirmation not delivered");
    }

    Ok(purchase)
}

/// Attach line items to a page of purchases with a single query.
pub async fn with_items(
    state: &AppState,
    purchases: Vec<Purchase>,
) -> anyhow::Result<Vec<PurchaseDetails>> {
    let ids: Vec<Uuid> = purchases.iter().map(|p| p.id).collect();
    let mut by_purchase: HashMap<Uuid, Vec<PurchaseItem>> = HashMap::new();
    for item in PurchaseItem::list_for(&state.db, &ids).await? {
        by_purchase.entry(item.purchase_id).or_default().push(item);
    }
    Ok(purchases
        .into_iter()
        .map(|p| {
            let items = by_purchase.remove(&p.id).unwrap_or_default();
            PurchaseDetails { purchase: p, items }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchases::dto::LineItemRequest;

    fn create_req() -> CreatePurchaseRequest {
        CreatePurchaseRequest {
            phone_number: "9876543210".into(),
            name: "Ram".into(),
            village: "Nawanagar".into(),
            sn: "SN-1".into(),
            products: None,
            manual_total_amount: Some(1000.0),
            deposit_amount: None,
        }
    }

    #[test]
    fn status_follows_remaining_amount() {
        let state = derive_payment(1000.0, 0.0);
        assert_eq!(state.remaining, 1000.0);
        assert_eq!(state.status, STATUS_PENDING);

        let state = derive_payment(1000.0, 1000.0);
        assert_eq!(state.remaining, 0.0);
        assert_eq!(state.status, STATUS_COMPLETED);

        // over-deposited records still read as completed
        let state = derive_payment(500.0, 600.0);
        assert!(state.remaining < 0.0);
        assert_eq!(state.status, STATUS_COMPLETED);
    }

    #[test]
    fn deposit_lifecycle_from_pending_to_completed() {
        // totalAmount=1000, depositAmount=0 -> pending
        let opened = derive_payment(1000.0, 0.0);
        assert_eq!(opened.status, STATUS_PENDING);

        // deposit 1000 -> remaining 0, completed
        let paid = apply_deposit(1000.0, opened.deposit, 1000.0, None).unwrap();
        assert_eq!(paid.remaining, 0.0);
        assert_eq!(paid.status, STATUS_COMPLETED);

        // deposit 1 more -> rejected, exceeds total
        let err = apply_deposit(1000.0, paid.deposit, 1.0, None).unwrap_err();
        assert!(matches!(err, PurchaseError::DepositExceedsTotal));
    }

    #[test]
    fn deposits_accumulate_and_never_shrink() {
        let step1 = apply_deposit(1000.0, 0.0, 300.0, None).unwrap();
        assert_eq!(step1.deposit, 300.0);
        assert_eq!(step1.remaining, 700.0);

        let step2 = apply_deposit(1000.0, step1.deposit, 200.0, None).unwrap();
        assert_eq!(step2.deposit, 500.0);

        let err = apply_deposit(1000.0, step2.deposit, -50.0, None).unwrap_err();
        assert!(matches!(err, PurchaseError::InvalidAmount));
    }

    #[test]
    fn manual_status_cannot_override_derivation() {
        // money still owed: forcing "completed" does not stick
        let state = apply_deposit(1000.0, 0.0, 100.0, Some("completed")).unwrap();
        assert_eq!(state.status, STATUS_PENDING);

        // fully paid: forcing "pending" does not revert
        let state = apply_deposit(1000.0, 500.0, 500.0, Some("pending")).unwrap();
        assert_eq!(state.status, STATUS_COMPLETED);

        let err = apply_deposit(1000.0, 0.0, 0.0, Some("refunded")).unwrap_err();
        assert!(matches!(err, PurchaseError::InvalidStatus));
    }

    #[test]
    fn create_requires_identity_fields() {
        let mut req = create_req();
        req.village = "  ".into();
        assert!(matches!(
            validate_create(&req).unwrap_err(),
            PurchaseError::MissingFields
        ));
    }

    #[test]
    fn create_requires_products_or_manual_total() {
        let mut req = create_req();
        req.manual_total_amount = None;
        assert!(matches!(
            validate_create(&req).unwrap_err(),
            PurchaseError::NothingToCharge
        ));

        req.products = Some(vec![]);
        assert!(matches!(
            validate_create(&req).unwrap_err(),
            PurchaseError::NothingToCharge
        ));

        req.products = Some(vec![LineItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 2,
        }]);
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn create_rejects_bad_amounts() {
        let mut req = create_req();
        req.manual_total_amount = Some(-10.0);
        assert!(matches!(
            validate_create(&req).unwrap_err(),
            PurchaseError::InvalidAmount
        ));

        let mut req = create_req();
        req.deposit_amount = Some(-1.0);
        assert!(matches!(
            validate_create(&req).unwrap_err(),
            PurchaseError::InvalidAmount
        ));

        let mut req = create_req();
        req.products = Some(vec![LineItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 0,
        }]);
        assert!(matches!(
            validate_create(&req).unwrap_err(),
            PurchaseError::InvalidAmount
        ));
    }

    fn bulk_row() -> BulkRow {
        BulkRow {
            phone_number: "9876543210".into(),
            customer_name: "Ram".into(),
            village: "Nawanagar".into(),
            sn: "SN-9".into(),
            total_amount: 500.0,
            deposit_amount: 100.0,
        }
    }

    #[test]
    fn bulk_row_validation() {
        assert!(validate_row(&bulk_row()).is_ok());

        let mut row = bulk_row();
        row.phone_number = "12345".into();
        assert!(validate_row(&row).unwrap_err().contains("Invalid phone number"));

        let mut row = bulk_row();
        row.customer_name = "".into();
        assert!(validate_row(&row).is_err());

        let mut row = bulk_row();
        row.deposit_amount = 600.0;
        assert!(validate_row(&row).unwrap_err().contains("cannot exceed"));

        let mut row = bulk_row();
        row.total_amount = -5.0;
        assert!(validate_row(&row).is_err());
    }
}
