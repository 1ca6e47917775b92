use sqlx::SqlitePool;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    pub category: String,
}

const DEFAULT_ACTIVITIES: [(&str, &str); 8] = [
    ("Football", "Sports"),
    ("Basketball", "Sports"),
    ("Running", "Sports"),
    ("Hiking", "Outdoors"),
    ("Climbing", "Outdoors"),
    ("Board games", "Games"),
    ("Book club", "Culture"),
    ("Museum visit", "Culture"),
];

pub async fn all(db_pool: &SqlitePool) -> Result<Vec<Activity>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, category FROM activities ORDER BY category, name")
        .fetch_all(db_pool)
        .await
}

pub async fn find(db_pool: &SqlitePool, id: i64) -> Result<Option<Activity>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, category FROM activities WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await
}

pub async fn create(db_pool: &SqlitePool, name: &str, category: &str) -> Result<Activity, sqlx::Error> {
    let now = OffsetDateTime::now_utc();
    sqlx::query_as(
        "INSERT INTO activities (name, category, created_at, updated_at) VALUES (?, ?, ?, ?)
         RETURNING id, name, category",
    )
    .bind(name.trim())
    .bind(category.trim())
    .bind(now)
    .bind(now)
    .fetch_one(db_pool)
    .await
}

/// Fills an empty activities table so events can be created on a fresh install.
pub async fn seed_defaults(db_pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM activities")
        .fetch_one(db_pool)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    for (name, category) in DEFAULT_ACTIVITIES {
        create(db_pool, name, category).await?;
    }
    tracing::info!(count = DEFAULT_ACTIVITIES.len(), "seeded default activities");
    Ok(DEFAULT_ACTIVITIES.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    #[tokio::test]
    async fn seeding_only_touches_an_empty_table() {
        let pool = testing::pool().await;

        assert_eq!(seed_defaults(&pool).await.unwrap(), DEFAULT_ACTIVITIES.len());
        assert_eq!(seed_defaults(&pool).await.unwrap(), 0);
        assert_eq!(all(&pool).await.unwrap().len(), DEFAULT_ACTIVITIES.len());
    }

    #[tokio::test]
    async fn listing_is_grouped_by_category() {
        let pool = testing::pool().await;
        create(&pool, "Yoga", "Wellness").await.unwrap();
        create(&pool, "Chess", "Games").await.unwrap();

        let categories: Vec<_> = all(&pool).await.unwrap().into_iter().map(|a| a.category).collect();
        assert_eq!(categories, ["Games", "Wellness"]);
    }
}
