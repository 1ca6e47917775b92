use sqlx::SqlitePool;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email_address: String,
    pub password_digest: String,
    pub name: String,
    pub created_at: OffsetDateTime,
}

/// Addresses are compared case-insensitively and without surrounding blanks.
pub fn normalize_email(email_address: &str) -> String {
    email_address.trim().to_lowercase()
}

pub async fn create(
    db_pool: &SqlitePool,
    email_address: &str,
    password_digest: &str,
    name: &str,
) -> Result<User, sqlx::Error> {
    let now = OffsetDateTime::now_utc();
    sqlx::query_as(
        "INSERT INTO users (email_address, password_digest, name, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id, email_address, password_digest, name, created_at",
    )
    .bind(normalize_email(email_address))
    .bind(password_digest)
    .bind(name.trim())
    .bind(now)
    .bind(now)
    .fetch_one(db_pool)
    .await
}

pub async fn find(db_pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT id, email_address, password_digest, name, created_at FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn find_by_email(
    db_pool: &SqlitePool,
    email_address: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, email_address, password_digest, name, created_at FROM users WHERE email_address=?",
    )
    .bind(normalize_email(email_address))
    .fetch_optional(db_pool)
    .await
}
