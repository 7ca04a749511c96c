use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, stock, is_active, \
     image_url, image_id, duration_from_days, duration_to_days, created_at";

/// Catalog product. Image fields are opaque references into an external
/// object store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub stock: i32,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub image_id: Option<String>,
    pub duration_from_days: i32,
    pub duration_to_days: i32,
    pub created_at: OffsetDateTime,
}

/// Fields for inserting a new product.
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: f64,
    pub category: Option<&'a str>,
    pub stock: i32,
    pub image_url: Option<&'a str>,
    pub image_id: Option<&'a str>,
    pub duration_from_days: i32,
    pub duration_to_days: i32,
}

impl Product {
    pub async fn list(
        db: &PgPool,
        category: Option<&str>,
        active: Option<bool>,
        search: Option<&str>,
    ) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::text IS NULL OR category = $1) \
               AND ($2::bool IS NULL OR is_active = $2) \
               AND ($3::text IS NULL \
                    OR name ILIKE '%' || $3 || '%' \
                    OR description ILIKE '%' || $3 || '%' \
                    OR category ILIKE '%' || $3 || '%') \
             ORDER BY created_at DESC"
        ))
        .bind(category)
        .bind(active)
        .bind(search)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn search(db: &PgPool, term: &str, limit: i64) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE name ILIKE '%' || $1 || '%' \
                OR description ILIKE '%' || $1 || '%' \
                OR category ILIKE '%' || $1 || '%' \
             LIMIT $2"
        ))
        .bind(term)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(product)
    }

    pub async fn create(db: &PgPool, new: NewProduct<'_>) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products \
                 (name, description, price, category, stock, image_url, image_id, \
                  duration_from_days, duration_to_days) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.description)
        .bind(new.price)
        .bind(new.category)
        .bind(new.stock)
        .bind(new.image_url)
        .bind(new.image_id)
        .bind(new.duration_from_days)
        .bind(new.duration_to_days)
        .fetch_one(db)
        .await?;
        Ok(product)
    }

    /// Partial update; absent fields keep their current value.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        price: Option<f64>,
        category: Option<&str>,
        stock: Option<i32>,
        is_active: Option<bool>,
        image_url: Option<&str>,
        image_id: Option<&str>,
        duration_from_days: Option<i32>,
        duration_to_days: Option<i32>,
    ) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 price = COALESCE($4, price), \
                 category = COALESCE($5, category), \
                 stock = COALESCE($6, stock), \
                 is_active = COALESCE($7, is_active), \
                 image_url = COALESCE($8, image_url), \
                 image_id = COALESCE($9, image_id), \
                 duration_from_days = COALESCE($10, duration_from_days), \
                 duration_to_days = COALESCE($11, duration_to_days) \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category)
        .bind(stock)
        .bind(is_active)
        .bind(image_url)
        .bind(image_id)
        .bind(duration_from_days)
        .bind(duration_to_days)
        .fetch_optional(db)
        .await?;
        Ok(product)
    }

    pub async fn delete_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
