use sqlx::SqlitePool;
use time::OffsetDateTime;

/// Messages reference their room polymorphically; chat rooms are the only kind.
pub const CHAT_ROOM_TYPE: &str = "ChatRoom";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub user_id: i64,
    pub chat_room_id: i64,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub author_name: String,
}

const SELECT_MESSAGES: &str = "
    SELECT m.id, m.user_id, m.chat_room_id, m.content, m.created_at, u.name AS author_name
    FROM messages m JOIN users u ON u.id = m.user_id";

pub async fn create(
    db_pool: &SqlitePool,
    chat_room_id: i64,
    user_id: i64,
    content: &str,
) -> Result<Message, sqlx::Error> {
    let now = OffsetDateTime::now_utc();
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO messages (user_id, chat_room_type, chat_room_id, content, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(user_id)
    .bind(CHAT_ROOM_TYPE)
    .bind(chat_room_id)
    .bind(content)
    .bind(now)
    .bind(now)
    .fetch_one(db_pool)
    .await?;

    sqlx::query_as(&format!("{SELECT_MESSAGES} WHERE m.id=?"))
        .bind(id)
        .fetch_one(db_pool)
        .await
}

pub async fn for_room(db_pool: &SqlitePool, chat_room_id: i64) -> Result<Vec<Message>, sqlx::Error> {
    sqlx::query_as(&format!(
        "{SELECT_MESSAGES} WHERE m.chat_room_type=? AND m.chat_room_id=? ORDER BY m.id"
    ))
    .bind(CHAT_ROOM_TYPE)
    .bind(chat_room_id)
    .fetch_all(db_pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{chat_rooms, events, testing};

    #[tokio::test]
    async fn messages_come_back_in_commit_order() {
        let pool = testing::pool().await;
        let user = testing::user(&pool, "chatty@example.com").await;
        let activity = testing::activity(&pool).await;
        let new_event = events::NewEvent {
            activity_id: activity.id,
            location: "Pier 3".to_owned(),
            location_name: None,
            start_time: time::macros::datetime!(2030-06-01 09:00),
            description: None,
            max_participants: 10,
        };
        let event_id = events::create_with_chat_room(&pool, user.id, &new_event).await.unwrap();
        let room = chat_rooms::for_event(&pool, event_id).await.unwrap().unwrap();

        let first = create(&pool, room.id, user.id, "hello").await.unwrap();
        create(&pool, room.id, user.id, "anyone there?").await.unwrap();
        assert_eq!(first.author_name, "Test User");

        let contents: Vec<_> = for_room(&pool, room.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["hello", "anyone there?"]);
    }

    #[tokio::test]
    async fn unknown_room_is_rejected_by_foreign_key() {
        let pool = testing::pool().await;
        let user = testing::user(&pool, "chatty@example.com").await;
        assert!(create(&pool, 12, user.id, "into the void").await.is_err());
    }
}
