//! Login sessions. The cookie only carries the row id; the row ties it to a
//! user and remembers where the login came from.

use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::users::User;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: OffsetDateTime,
}

pub async fn start(
    db_pool: &SqlitePool,
    user_id: i64,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<SessionRecord, sqlx::Error> {
    let now = OffsetDateTime::now_utc();
    sqlx::query_as(
        "INSERT INTO sessions (user_id, ip_address, user_agent, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id, user_id, ip_address, user_agent, created_at",
    )
    .bind(user_id)
    .bind(ip_address)
    .bind(user_agent)
    .bind(now)
    .bind(now)
    .fetch_one(db_pool)
    .await
}

/// The user behind a session row, if the row still exists.
pub async fn resume(db_pool: &SqlitePool, session_id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        "SELECT u.id, u.email_address, u.password_digest, u.name, u.created_at
         FROM sessions s JOIN users u ON u.id = s.user_id
         WHERE s.id=?",
    )
    .bind(session_id)
    .fetch_optional(db_pool)
    .await
}

pub async fn terminate(db_pool: &SqlitePool, session_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE id=?")
        .bind(session_id)
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn for_user(db_pool: &SqlitePool, user_id: i64) -> Result<Vec<SessionRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, user_id, ip_address, user_agent, created_at FROM sessions WHERE user_id=? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    #[tokio::test]
    async fn session_lifecycle() {
        let pool = testing::pool().await;
        let user = testing::user(&pool, "foo@bar.com").await;

        let record = start(&pool, user.id, Some("10.0.0.1"), Some("curl/8.0")).await.unwrap();
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(resume(&pool, record.id).await.unwrap().unwrap().id, user.id);
        assert_eq!(for_user(&pool, user.id).await.unwrap().len(), 1);

        assert!(terminate(&pool, record.id).await.unwrap());
        assert!(resume(&pool, record.id).await.unwrap().is_none());
        assert!(!terminate(&pool, record.id).await.unwrap());
    }
}
