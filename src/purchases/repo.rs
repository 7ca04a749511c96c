use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const PURCHASE_COLUMNS: &str = "id, user_id, sn, phone_number, name, village, manual_total_amount, \
     total_amount, deposit_amount, remaining_amount, payment_status, purchased_at";
const ITEM_COLUMNS: &str = "id, purchase_id, product_id, product_name, quantity, price_at_purchase";

/// Ledger entry. Customer fields are snapshots taken at purchase time; the
/// user reference may be null when the account was removed later.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub sn: String,
    pub phone_number: String,
    pub name: String,
    pub village: String,
    pub manual_total_amount: Option<f64>,
    pub total_amount: f64,
    pub deposit_amount: f64,
    pub remaining_amount: f64,
    pub payment_status: String,
    pub purchased_at: OffsetDateTime,
}

/// Line item with the product name and price snapshotted at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: f64,
}

pub struct NewPurchase<'a> {
    pub user_id: Option<Uuid>,
    pub sn: &'a str,
    pub phone_number: &'a str,
    pub name: &'a str,
    pub village: &'a str,
    pub manual_total_amount: Option<f64>,
    pub total_amount: f64,
    pub deposit_amount: f64,
    pub remaining_amount: f64,
    pub payment_status: &'a str,
}

pub struct NewItem {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: f64,
}

impl Purchase {
    /// Insert the purchase and its line items in one transaction.
    pub async fn insert_with_items(
        db: &PgPool,
        new: NewPurchase<'_>,
        items: &[NewItem],
    ) -> anyhow::Result<(Purchase, Vec<PurchaseItem>)> {
        let mut tx = db.begin().await.context("begin tx")?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "INSERT INTO purchases \
                 (user_id, sn, phone_number, name, village, manual_total_amount, \
                  total_amount, deposit_amount, remaining_amount, payment_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {PURCHASE_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(new.sn)
        .bind(new.phone_number)
        .bind(new.name)
        .bind(new.village)
        .bind(new.manual_total_amount)
        .bind(new.total_amount)
        .bind(new.deposit_amount)
        .bind(new.remaining_amount)
        .bind(new.payment_status)
        .fetch_one(&mut *tx)
        .await
        .context("insert purchase")?;

        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, PurchaseItem>(&format!(
                "INSERT INTO purchase_items \
                     (purchase_id, product_id, product_name, quantity, price_at_purchase) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(purchase.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price_at_purchase)
            .fetch_one(&mut *tx)
            .await
            .context("insert purchase item")?;
            saved.push(row);
        }

        tx.commit().await.context("commit tx")?;
        Ok((purchase, saved))
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(purchase)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases ORDER BY purchased_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE user_id = $1 ORDER BY purchased_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Persist recomputed payment fields.
    pub async fn update_payment(
        db: &PgPool,
        id: Uuid,
        deposit_amount: f64,
        remaining_amount: f64,
        payment_status: &str,
    ) -> anyhow::Result<Purchase> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "UPDATE purchases \
             SET deposit_amount = $2, remaining_amount = $3, payment_status = $4 \
             WHERE id = $1 RETURNING {PURCHASE_COLUMNS}"
        ))
        .bind(id)
        .bind(deposit_amount)
        .bind(remaining_amount)
        .bind(payment_status)
        .fetch_one(db)
        .await
        .context("update purchase payment")?;
        Ok(purchase)
    }
}

impl PurchaseItem {
    pub async fn list_for(db: &PgPool, purchase_ids: &[Uuid]) -> anyhow::Result<Vec<PurchaseItem>> {
        if purchase_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, PurchaseItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = ANY($1)"
        ))
        .bind(purchase_ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
