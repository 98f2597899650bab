// src/database/analytics.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::new_id;
use crate::types::Platform;

/// Engagement counters; `None` when the platform did not expose them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsMetrics {
    pub impressions: Option<i64>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
    pub clicks: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnalyticsRecord {
    pub id: String,
    pub post_id: String,
    pub collected_at: DateTime<Utc>,
    pub impressions: Option<i64>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
    pub clicks: Option<i64>,
}

pub struct AnalyticsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AnalyticsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, post_id: &str, metrics: AnalyticsMetrics) -> Result<AnalyticsRecord> {
        let record = AnalyticsRecord {
            id: new_id(),
            post_id: post_id.to_string(),
            collected_at: Utc::now(),
            impressions: metrics.impressions,
            likes: metrics.likes,
            comments: metrics.comments,
            shares: metrics.shares,
            clicks: metrics.clicks,
        };

        sqlx::query(
            r#"
            INSERT INTO analytics (id, post_id, collected_at, impressions, likes, comments, shares, clicks)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.post_id)
        .bind(record.collected_at)
        .bind(record.impressions)
        .bind(record.likes)
        .bind(record.comments)
        .bind(record.shares)
        .bind(record.clicks)
        .execute(self.pool)
        .await
        .context("Failed to record analytics")?;

        Ok(record)
    }

    pub async fn latest_for_post(&self, post_id: &str) -> Result<Option<AnalyticsRecord>> {
        let record = sqlx::query_as::<_, AnalyticsRecord>(
            r#"
            SELECT id, post_id, collected_at, impressions, likes, comments, shares, clicks
            FROM analytics
            WHERE post_id = ?
            ORDER BY collected_at DESC
            LIMIT 1
            "#,
        )
        .bind(post_id)
        .fetch_optional(self.pool)
        .await
        .context("Failed to load analytics")?;
        Ok(record)
    }

    /// Newest first, optionally restricted to one platform's posts
    pub async fn list(&self, platform: Option<Platform>, limit: Option<i64>) -> Result<Vec<AnalyticsRecord>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT a.id, a.post_id, a.collected_at, a.impressions, a.likes, a.comments, \
             a.shares, a.clicks FROM analytics a JOIN posted_items p ON p.id = a.post_id",
        );
        if let Some(platform) = platform {
            builder.push(" WHERE p.platform = ").push_bind(platform);
        }
        builder.push(" ORDER BY a.collected_at DESC");
        if let Some(limit) = limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let records = builder
            .build_query_as::<AnalyticsRecord>()
            .fetch_all(self.pool)
            .await
            .context("Failed to list analytics")?;
        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analytics")
            .fetch_one(self.pool)
            .await
            .context("Failed to count analytics")?;
        Ok(count)
    }

    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM analytics")
            .execute(self.pool)
            .await
            .context("Failed to clear analytics")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::database::{JobRepository, PostedItemRepository};
    use crate::jobs::model::sample_job;

    #[tokio::test]
    async fn test_record_and_latest() {
        let db = Database::in_memory().await.unwrap();
        let job_id = JobRepository::new(db.pool())
            .upsert(&sample_job("Analyst", "Acme", "Pune"))
            .await
            .unwrap()
            .id;
        let item = PostedItemRepository::new(db.pool())
            .record(&job_id, Platform::Linkedin, None, None)
            .await
            .unwrap();
        let repo = AnalyticsRepository::new(db.pool());

        assert!(repo.latest_for_post(&item.id).await.unwrap().is_none());
        repo.record(&item.id, AnalyticsMetrics::default()).await.unwrap();
        let second = repo
            .record(
                &item.id,
                AnalyticsMetrics {
                    likes: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let latest = repo.latest_for_post(&item.id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.likes, Some(3));

        assert_eq!(repo.list(Some(Platform::Linkedin), None).await.unwrap().len(), 2);
        assert!(repo.list(Some(Platform::X), None).await.unwrap().is_empty());
        assert_eq!(repo.clear().await.unwrap(), 2);
    }
}
