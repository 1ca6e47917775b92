//! Versioned schema migrations, applied at startup.

use sqlx::SqlitePool;

pub const CURRENT_VERSION: i64 = 3;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: accounts and login sessions
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email_address TEXT NOT NULL,
        password_digest TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS index_users_on_email_address ON users (email_address);

    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        ip_address TEXT,
        user_agent TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS index_sessions_on_user_id ON sessions (user_id);
"#;

/// Migration 2: activities, events and who takes part in them
const MIGRATION_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS activities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        activity_id INTEGER NOT NULL REFERENCES activities (id),
        location TEXT NOT NULL,
        location_name TEXT,
        start_time TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'open',
        description TEXT,
        max_participants INTEGER NOT NULL CHECK (max_participants > 0),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS index_events_on_activity_id ON events (activity_id);
    CREATE INDEX IF NOT EXISTS index_events_on_user_id ON events (user_id);

    CREATE TABLE IF NOT EXISTS participants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        event_id INTEGER NOT NULL REFERENCES events (id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (user_id, event_id)
    );
    CREATE INDEX IF NOT EXISTS index_participants_on_event_id ON participants (event_id);
"#;

/// Migration 3: chat rooms and their messages
const MIGRATION_V3: &str = r#"
    CREATE TABLE IF NOT EXISTS chat_rooms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        event_id INTEGER NOT NULL REFERENCES events (id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS index_chat_rooms_on_event_id ON chat_rooms (event_id);

    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        chat_room_type TEXT NOT NULL,
        chat_room_id INTEGER NOT NULL REFERENCES chat_rooms (id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS index_messages_on_chat_room ON messages (chat_room_type, chat_room_id);
    CREATE INDEX IF NOT EXISTS index_messages_on_user_id ON messages (user_id);
"#;

const MIGRATIONS: [(i64, &str, &str); 3] = [
    (1, "users and sessions", MIGRATION_V1),
    (2, "activities, events and participants", MIGRATION_V2),
    (3, "chat rooms and messages", MIGRATION_V3),
];

async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i64> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;
    let version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM _migrations")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

async fn record_migration(pool: &SqlitePool, version: i64) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version,
        target_version = CURRENT_VERSION,
        "checking database migrations"
    );

    for (version, name, sql) in MIGRATIONS {
        if current_version >= version {
            continue;
        }
        tracing::info!(version, name, "applying migration");
        sqlx::raw_sql(sql).execute(pool).await?;
        record_migration(pool, version).await?;
    }

    Ok(())
}

#[cfg(test)]
async fn needs_migration(pool: &SqlitePool) -> anyhow::Result<bool> {
    Ok(get_current_version(pool).await? < CURRENT_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::connect_in_memory;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = connect_in_memory().await.unwrap();
        assert!(needs_migration(&pool).await.unwrap());

        run_migrations(&pool).await.unwrap();

        assert_eq!(get_current_version(&pool).await.unwrap(), CURRENT_VERSION);
        assert!(!needs_migration(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = connect_in_memory().await.unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_max_participants_must_be_positive() {
        let pool = crate::store::testing::pool().await;
        let user = crate::store::testing::user(&pool, "a@example.com").await;
        let activity = crate::store::testing::activity(&pool).await;

        let result = sqlx::query(
            "INSERT INTO events (user_id, activity_id, location, start_time, max_participants, created_at, updated_at)
             VALUES (?, ?, 'Park', '2030-01-01 10:00:00', 0, 'now', 'now')",
        )
        .bind(user.id)
        .bind(activity.id)
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
