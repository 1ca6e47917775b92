//! SQLite persistence: one module per table plus schema migrations.

pub mod activities;
pub mod chat_rooms;
pub mod events;
pub mod messages;
pub mod migrations;
pub mod participants;
pub mod sessions;
pub mod users;

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::config::Config;

pub use migrations::run_migrations;

pub async fn connect(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(options)
        .await?;
    tracing::info!(url = %config.database_url, "connected to database");
    Ok(pool)
}

/// A private in-memory database. Pinned to a single connection that never
/// idles out, otherwise the schema would vanish with it.
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::SqlitePool;

    use super::{activities, connect_in_memory, run_migrations, users};

    pub async fn pool() -> SqlitePool {
        let pool = connect_in_memory().await.expect("in-memory pool");
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    pub async fn user(pool: &SqlitePool, email: &str) -> users::User {
        users::create(pool, email, "not-a-real-digest", "Test User")
            .await
            .expect("user")
    }

    pub async fn activity(pool: &SqlitePool) -> activities::Activity {
        activities::create(pool, "Football", "Sports")
            .await
            .expect("activity")
    }
}
