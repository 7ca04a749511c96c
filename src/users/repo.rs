use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const ROLE_FARMER: &str = "farmer";
pub const ROLE_ADMIN: &str = "admin";

const USER_COLUMNS: &str = "id, phone_number, password_hash, name, village, role, \
     language_preference, must_reset_password, reset_token_hash, reset_token_expires, created_at";

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub village: Option<String>,
    pub role: String,
    pub language_preference: String,
    pub must_reset_password: bool,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Fields for inserting a new user.
pub struct NewUser<'a> {
    pub phone_number: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub village: Option<&'a str>,
    pub role: &'a str,
    pub language_preference: &'a str,
    pub must_reset_password: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub async fn find_by_phone(db: &PgPool, phone_number: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone_number = $1"
        ))
        .bind(phone_number)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(db)
                .await?;
        Ok(user)
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users \
                 (phone_number, password_hash, name, village, role, language_preference, must_reset_password) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.phone_number)
        .bind(new.password_hash)
        .bind(new.name)
        .bind(new.village)
        .bind(new.role)
        .bind(new.language_preference)
        .bind(new.must_reset_password)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Users to target for a broadcast, optionally restricted to one role.
    pub async fn list_by_role(db: &PgPool, role: Option<&str>) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE ($1::text IS NULL OR role = $1)"
        ))
        .bind(role)
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    pub async fn delete_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_admins(db: &PgPool) -> anyhow::Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1")
                .bind(ROLE_ADMIN)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn update_role(db: &PgPool, id: Uuid, role: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        language_preference: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET name = COALESCE($2, name), language_preference = COALESCE($3, language_preference) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(language_preference)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET reset_token_hash = $2, reset_token_expires = $3 WHERE id = $1")
            .bind(id)
            .bind(token_hash)
            .bind(expires)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Store a new password hash and clear any pending reset state.
    pub async fn reset_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users \
             SET password_hash = $2, reset_token_hash = NULL, reset_token_expires = NULL, \
                 must_reset_password = FALSE \
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}
