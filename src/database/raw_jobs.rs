// src/database/raw_jobs.rs
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

use super::new_id;

pub struct RawJobRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RawJobRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a payload unless the same source already delivered it; returns true when stored
    pub async fn insert_if_new(&self, source: &str, payload: &Value) -> Result<bool> {
        // serde_json serializes object keys in sorted order, so equal payloads
        // always produce the same text
        let text = serde_json::to_string(payload).context("Failed to serialize raw job")?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO jobs_raw (id, source, fetched_at, payload)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(source)
        .bind(Utc::now())
        .bind(text)
        .execute(self.pool)
        .await
        .context("Failed to insert raw job")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs_raw")
            .fetch_one(self.pool)
            .await
            .context("Failed to count raw jobs")?;
        Ok(count)
    }

    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs_raw")
            .execute(self.pool)
            .await
            .context("Failed to clear raw jobs")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use serde_json::json;

    #[tokio::test]
    async fn test_repeated_payload_is_ignored_per_source() {
        let db = Database::in_memory().await.unwrap();
        let repo = RawJobRepository::new(db.pool());
        let payload = json!({"id": "1", "title": "Analyst"});
        let reordered = json!({"title": "Analyst", "id": "1"});

        assert!(repo.insert_if_new("jooble", &payload).await.unwrap());
        assert!(!repo.insert_if_new("jooble", &reordered).await.unwrap());
        assert!(repo.insert_if_new("jsearch", &payload).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 2);

        assert_eq!(repo.clear().await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
