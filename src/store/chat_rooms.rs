use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatRoom {
    pub id: i64,
    pub name: Option<String>,
    pub event_id: i64,
}

pub async fn find(db_pool: &SqlitePool, id: i64) -> Result<Option<ChatRoom>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, event_id FROM chat_rooms WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn for_event(db_pool: &SqlitePool, event_id: i64) -> Result<Option<ChatRoom>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, event_id FROM chat_rooms WHERE event_id=? ORDER BY id LIMIT 1")
        .bind(event_id)
        .fetch_optional(db_pool)
        .await
}
