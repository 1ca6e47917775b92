use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::events;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
    Full,
    NoSuchEvent,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Participant {
    pub user_id: i64,
    pub name: String,
}

/// The capacity check and the insert are one statement, so it takes the
/// write lock up front and concurrent joins queue on the busy timeout
/// instead of failing with a lock upgrade error.
pub async fn join(db_pool: &SqlitePool, event_id: i64, user_id: i64) -> Result<JoinOutcome, sqlx::Error> {
    let now = OffsetDateTime::now_utc();
    let mut tx = db_pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO participants (user_id, event_id, created_at, updated_at)
         SELECT ?, e.id, ?, ?
         FROM events e
         WHERE e.id = ?
           AND NOT EXISTS (SELECT 1 FROM participants p WHERE p.event_id = e.id AND p.user_id = ?)
           AND (SELECT COUNT(*) FROM participants p WHERE p.event_id = e.id) < e.max_participants",
    )
    .bind(user_id)
    .bind(now)
    .bind(now)
    .bind(event_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 1 {
        events::refresh_status(&mut *tx, event_id).await?;
        tx.commit().await?;
        return Ok(JoinOutcome::Joined);
    }
    tx.rollback().await?;

    // nothing inserted, work out why
    let event_exists = sqlx::query("SELECT 1 FROM events WHERE id=?")
        .bind(event_id)
        .fetch_optional(db_pool)
        .await?
        .is_some();
    if !event_exists {
        return Ok(JoinOutcome::NoSuchEvent);
    }
    let already_joined = sqlx::query("SELECT 1 FROM participants WHERE event_id=? AND user_id=?")
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?
        .is_some();
    Ok(if already_joined { JoinOutcome::AlreadyJoined } else { JoinOutcome::Full })
}

/// Returns whether the user was taking part.
pub async fn leave(db_pool: &SqlitePool, event_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
    let mut tx = db_pool.begin().await?;

    let result = sqlx::query("DELETE FROM participants WHERE event_id=? AND user_id=?")
        .bind(event_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    events::refresh_status(&mut *tx, event_id).await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn for_event(db_pool: &SqlitePool, event_id: i64) -> Result<Vec<Participant>, sqlx::Error> {
    sqlx::query_as(
        "SELECT p.user_id, u.name FROM participants p JOIN users u ON u.id = p.user_id
         WHERE p.event_id=? ORDER BY p.id",
    )
    .bind(event_id)
    .fetch_all(db_pool)
    .await
}

pub async fn count(db_pool: &SqlitePool, event_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE event_id=?")
        .bind(event_id)
        .fetch_one(db_pool)
        .await
}
