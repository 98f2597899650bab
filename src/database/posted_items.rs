// src/database/posted_items.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{new_id, start_of_today, start_of_yesterday};
use crate::types::Platform;

/// A successful publication
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostedItem {
    pub id: String,
    pub job_id: String,
    pub platform: Platform,
    pub posted_at: DateTime<Utc>,
    pub external_post_id: Option<String>,
    pub post_url: Option<String>,
}

pub struct PostedItemRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostedItemRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        job_id: &str,
        platform: Platform,
        external_post_id: Option<&str>,
        post_url: Option<&str>,
    ) -> Result<PostedItem> {
        let item = PostedItem {
            id: new_id(),
            job_id: job_id.to_string(),
            platform,
            posted_at: Utc::now(),
            external_post_id: external_post_id.map(str::to_string),
            post_url: post_url.map(str::to_string),
        };

        sqlx::query(
            r#"
            INSERT INTO posted_items (id, job_id, platform, posted_at, external_post_id, post_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.job_id)
        .bind(item.platform)
        .bind(item.posted_at)
        .bind(&item.external_post_id)
        .bind(&item.post_url)
        .execute(self.pool)
        .await
        .context("Failed to record posted item")?;

        Ok(item)
    }

    pub async fn count_since(&self, platform: Platform, since: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posted_items WHERE platform = ? AND posted_at >= ?",
        )
        .bind(platform)
        .bind(since)
        .fetch_one(self.pool)
        .await
        .context("Failed to count posted items")?;
        Ok(count)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posted_items")
            .fetch_one(self.pool)
            .await
            .context("Failed to count posted items")?;
        Ok(count)
    }

    /// Newest first
    pub async fn list(&self, platform: Option<Platform>, limit: Option<i64>) -> Result<Vec<PostedItem>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, job_id, platform, posted_at, external_post_id, post_url FROM posted_items",
        );
        if let Some(platform) = platform {
            builder.push(" WHERE platform = ").push_bind(platform);
        }
        builder.push(" ORDER BY posted_at DESC");
        if let Some(limit) = limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let items = builder
            .build_query_as::<PostedItem>()
            .fetch_all(self.pool)
            .await
            .context("Failed to list posted items")?;
        Ok(items)
    }

    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posted_items")
            .execute(self.pool)
            .await
            .context("Failed to clear posted items")?;
        Ok(result.rows_affected())
    }

    /// Re-date today's publications for a platform to yesterday, freeing the daily budget
    pub async fn move_today_to_yesterday(&self, platform: Platform) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE posted_items SET posted_at = ? WHERE platform = ? AND posted_at >= ?",
        )
        .bind(start_of_yesterday())
        .bind(platform)
        .bind(start_of_today())
        .execute(self.pool)
        .await
        .context("Failed to re-date today's posted items")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::database::JobRepository;
    use crate::jobs::model::sample_job;

    #[tokio::test]
    async fn test_daily_count_and_reset() {
        let db = Database::in_memory().await.unwrap();
        let job_id = JobRepository::new(db.pool())
            .upsert(&sample_job("Analyst", "Acme", "Pune"))
            .await
            .unwrap()
            .id;
        let repo = PostedItemRepository::new(db.pool());

        repo.record(&job_id, Platform::Linkedin, Some("urn:1"), None)
            .await
            .unwrap();
        repo.record(&job_id, Platform::Linkedin, None, None)
            .await
            .unwrap();

        let today = start_of_today();
        assert_eq!(repo.count_since(Platform::Linkedin, today).await.unwrap(), 2);
        assert_eq!(repo.count_since(Platform::X, today).await.unwrap(), 0);

        assert_eq!(
            repo.move_today_to_yesterday(Platform::Linkedin).await.unwrap(),
            2
        );
        assert_eq!(repo.count_since(Platform::Linkedin, today).await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 2);

        let listed = repo.list(Some(Platform::Linkedin), Some(1)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(repo.clear().await.unwrap(), 2);
    }
}
