use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const ANNOUNCEMENT_COLUMNS: &str = "id, message_en, message_hi, target_role, created_by, created_at";

/// Record of a broadcast. The send itself is fire-and-forget; the record is
/// not used to resend.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub message_en: String,
    pub message_hi: Option<String>,
    pub target_role: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl Announcement {
    pub async fn create(
        db: &PgPool,
        message_en: &str,
        message_hi: Option<&str>,
        target_role: Option<&str>,
        created_by: Uuid,
    ) -> anyhow::Result<Announcement> {
        let announcement = sqlx::query_as::<_, Announcement>(&format!(
            "INSERT INTO announcements (message_en, message_hi, target_role, created_by) \
             VALUES ($1, $2, $3, $4) RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(message_en)
        .bind(message_hi)
        .bind(target_role)
        .bind(created_by)
        .fetch_one(db)
        .await?;
        Ok(announcement)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, Announcement>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn delete_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Pending purchase joined to its (possibly missing) user, for reminders.
#[derive(Debug, Clone, FromRow)]
pub struct PendingPurchaseRow {
    pub purchase_id: Uuid,
    pub user_id: Option<Uuid>,
    pub remaining_amount: f64,
    pub purchased_at: OffsetDateTime,
    pub user_phone: Option<String>,
}

pub async fn list_pending_with_users(db: &PgPool) -> anyhow::Result<Vec<PendingPurchaseRow>> {
    let rows = sqlx::query_as::<_, PendingPurchaseRow>(
        "SELECT p.id AS purchase_id, p.user_id, p.remaining_amount, p.purchased_at, \
                u.phone_number AS user_phone \
         FROM purchases p \
         LEFT JOIN users u ON u.id = p.user_id \
         WHERE p.payment_status = 'pending' AND p.remaining_amount > 0 \
         ORDER BY p.purchased_at ASC",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}
