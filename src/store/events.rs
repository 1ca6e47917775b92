use sqlx::{SqliteConnection, SqlitePool};
use time::{OffsetDateTime, PrimitiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Open,
    Full,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Open => "open",
            EventStatus::Full => "full",
        }
    }

    pub fn for_capacity(participants: i64, max_participants: i64) -> Self {
        if participants >= max_participants {
            EventStatus::Full
        } else {
            EventStatus::Open
        }
    }
}

/// An event joined with the names a page needs to show it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub user_id: i64,
    pub activity_id: i64,
    pub location: String,
    pub location_name: Option<String>,
    pub start_time: PrimitiveDateTime,
    pub status: String,
    pub description: Option<String>,
    pub max_participants: i64,
    pub organizer_name: String,
    pub activity_name: String,
    pub activity_category: String,
    pub participant_count: i64,
}

impl Event {
    pub fn is_full(&self) -> bool {
        EventStatus::for_capacity(self.participant_count, self.max_participants) == EventStatus::Full
    }

    pub fn display_name(&self) -> &str {
        self.location_name.as_deref().unwrap_or(&self.location)
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub activity_id: i64,
    pub location: String,
    pub location_name: Option<String>,
    pub start_time: PrimitiveDateTime,
    pub description: Option<String>,
    pub max_participants: i64,
}

const SELECT_EVENTS: &str = "
    SELECT e.id, e.user_id, e.activity_id, e.location, e.location_name, e.start_time, e.status,
           e.description, e.max_participants,
           u.name AS organizer_name,
           a.name AS activity_name,
           a.category AS activity_category,
           (SELECT COUNT(*) FROM participants p WHERE p.event_id = e.id) AS participant_count
    FROM events e
    JOIN users u ON u.id = e.user_id
    JOIN activities a ON a.id = e.activity_id";

pub async fn all(db_pool: &SqlitePool) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_EVENTS} ORDER BY e.start_time, e.id"))
        .fetch_all(db_pool)
        .await
}

pub async fn find(db_pool: &SqlitePool, id: i64) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as(&format!("{SELECT_EVENTS} WHERE e.id=?"))
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

/// Inserts the event and its chat room together. Returns the event id.
pub async fn create_with_chat_room(
    db_pool: &SqlitePool,
    user_id: i64,
    new_event: &NewEvent,
) -> Result<i64, sqlx::Error> {
    let now = OffsetDateTime::now_utc();
    let mut tx = db_pool.begin().await?;

    let (event_id,): (i64,) = sqlx::query_as(
        "INSERT INTO events (user_id, activity_id, location, location_name, start_time, status,
                             description, max_participants, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(user_id)
    .bind(new_event.activity_id)
    .bind(&new_event.location)
    .bind(&new_event.location_name)
    .bind(new_event.start_time)
    .bind(EventStatus::Open.as_str())
    .bind(&new_event.description)
    .bind(new_event.max_participants)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let room_name = new_event
        .location_name
        .as_deref()
        .unwrap_or(&new_event.location);
    sqlx::query("INSERT INTO chat_rooms (name, event_id, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(room_name)
        .bind(event_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(event_id)
}

/// Recomputes `status` from the current participant count.
pub async fn refresh_status(conn: &mut SqliteConnection, event_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE events
         SET status = CASE
                 WHEN (SELECT COUNT(*) FROM participants p WHERE p.event_id = events.id) >= max_participants
                 THEN ? ELSE ? END,
             updated_at = ?
         WHERE id=?",
    )
    .bind(EventStatus::Full.as_str())
    .bind(EventStatus::Open.as_str())
    .bind(OffsetDateTime::now_utc())
    .bind(event_id)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::store::{chat_rooms, testing};

    fn new_event(activity_id: i64, max_participants: i64) -> NewEvent {
        NewEvent {
            activity_id,
            location: "Central Park".to_owned(),
            location_name: None,
            start_time: datetime!(2030-05-01 18:30),
            description: Some("Bring a ball".to_owned()),
            max_participants,
        }
    }

    #[test]
    fn status_follows_capacity() {
        assert_eq!(EventStatus::for_capacity(0, 2), EventStatus::Open);
        assert_eq!(EventStatus::for_capacity(2, 2), EventStatus::Full);
        assert_eq!(EventStatus::Full.as_str(), "full");
    }

    #[tokio::test]
    async fn creating_an_event_opens_its_chat_room() {
        let pool = testing::pool().await;
        let user = testing::user(&pool, "org@example.com").await;
        let activity = testing::activity(&pool).await;

        let event_id = create_with_chat_room(&pool, user.id, &new_event(activity.id, 4))
            .await
            .unwrap();

        let event = find(&pool, event_id).await.unwrap().unwrap();
        assert_eq!(event.organizer_name, "Test User");
        assert_eq!(event.activity_name, "Football");
        assert_eq!(event.status, "open");
        assert_eq!(event.participant_count, 0);
        assert_eq!(event.start_time, datetime!(2030-05-01 18:30));

        let room = chat_rooms::for_event(&pool, event_id).await.unwrap().unwrap();
        assert_eq!(room.name.as_deref(), Some("Central Park"));
        assert_eq!(all(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_activity_is_rejected_by_foreign_key() {
        let pool = testing::pool().await;
        let user = testing::user(&pool, "org@example.com").await;

        let result = create_with_chat_room(&pool, user.id, &new_event(404, 4)).await;
        assert!(result.is_err());
        assert!(all(&pool).await.unwrap().is_empty());
    }
}
