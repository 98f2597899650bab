// src/database/posts.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use super::{new_id, start_of_today, start_of_yesterday};
use crate::types::{Platform, PostStatus};

/// A caption stored in `posts_ready`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostRecord {
    pub id: String,
    pub job_id: String,
    pub platform: Platform,
    pub caption: String,
    pub status: PostStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub platform: Option<Platform>,
    pub status: Option<PostStatus>,
    pub limit: Option<i64>,
}

pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_pending(
        &self,
        job_id: &str,
        platform: Platform,
        caption: &str,
    ) -> Result<PostRecord> {
        let record = PostRecord {
            id: new_id(),
            job_id: job_id.to_string(),
            platform,
            caption: caption.to_string(),
            status: PostStatus::Pending,
            scheduled_for: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO posts_ready (id, job_id, platform, caption, status, scheduled_for, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.job_id)
        .bind(record.platform)
        .bind(&record.caption)
        .bind(record.status)
        .bind(record.scheduled_for)
        .bind(record.created_at)
        .execute(self.pool)
        .await
        .context("Failed to store pending post")?;

        Ok(record)
    }

    /// Newest first
    pub async fn list(&self, query: &PostQuery) -> Result<Vec<PostRecord>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, job_id, platform, caption, status, scheduled_for, created_at \
             FROM posts_ready WHERE 1 = 1",
        );
        if let Some(platform) = query.platform {
            builder.push(" AND platform = ").push_bind(platform);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let posts = builder
            .build_query_as::<PostRecord>()
            .fetch_all(self.pool)
            .await
            .context("Failed to list posts")?;
        Ok(posts)
    }

    /// Pending posts for a platform, oldest first
    pub async fn pending(&self, platform: Platform, limit: i64) -> Result<Vec<PostRecord>> {
        let posts = sqlx::query_as::<_, PostRecord>(
            r#"
            SELECT id, job_id, platform, caption, status, scheduled_for, created_at
            FROM posts_ready
            WHERE platform = ? AND status = 'pending'
            ORDER BY created_at ASC
            LIMIT ?
            "#,
        )
        .bind(platform)
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .context("Failed to load pending posts")?;
        Ok(posts)
    }

    pub async fn set_status(&self, id: &str, status: PostStatus) -> Result<()> {
        sqlx::query("UPDATE posts_ready SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(self.pool)
            .await
            .with_context(|| format!("Failed to mark post {} as {}", id, status))?;
        Ok(())
    }

    pub async fn job_has_posts(&self, job_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts_ready WHERE job_id = ?")
            .bind(job_id)
            .fetch_one(self.pool)
            .await
            .context("Failed to check posts for job")?;
        Ok(count > 0)
    }

    /// Delete pending posts, for one platform or all of them
    pub async fn clear_pending(&self, platform: Option<Platform>) -> Result<u64> {
        let result = match platform {
            Some(platform) => {
                sqlx::query("DELETE FROM posts_ready WHERE status = 'pending' AND platform = ?")
                    .bind(platform)
                    .execute(self.pool)
                    .await
            }
            None => {
                sqlx::query("DELETE FROM posts_ready WHERE status = 'pending'")
                    .execute(self.pool)
                    .await
            }
        }
        .context("Failed to clear pending posts")?;

        info!("Cleared {} pending posts", result.rows_affected());
        Ok(result.rows_affected())
    }

    pub async fn count(&self, status: Option<PostStatus>) -> Result<i64> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts_ready WHERE status = ?")
                    .bind(status)
                    .fetch_one(self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts_ready")
                    .fetch_one(self.pool)
                    .await
            }
        }
        .context("Failed to count posts")?;
        Ok(count)
    }

    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM posts_ready")
            .execute(self.pool)
            .await
            .context("Failed to clear posts")?;
        Ok(result.rows_affected())
    }

    /// Re-date today's posts for a platform to yesterday
    pub async fn move_today_to_yesterday(&self, platform: Platform) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE posts_ready SET created_at = ? WHERE platform = ? AND created_at >= ?",
        )
        .bind(start_of_yesterday())
        .bind(platform)
        .bind(start_of_today())
        .execute(self.pool)
        .await
        .context("Failed to re-date today's posts")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::database::JobRepository;
    use crate::jobs::model::sample_job;

    async fn seeded() -> (Database, String) {
        let db = Database::in_memory().await.unwrap();
        let job_id = JobRepository::new(db.pool())
            .upsert(&sample_job("Analyst", "Acme", "Pune"))
            .await
            .unwrap()
            .id;
        (db, job_id)
    }

    #[tokio::test]
    async fn test_pending_lifecycle() {
        let (db, job_id) = seeded().await;
        let repo = PostRepository::new(db.pool());

        assert!(!repo.job_has_posts(&job_id).await.unwrap());
        let linkedin = repo
            .create_pending(&job_id, Platform::Linkedin, "Hiring!")
            .await
            .unwrap();
        repo.create_pending(&job_id, Platform::X, "Hiring")
            .await
            .unwrap();
        assert!(repo.job_has_posts(&job_id).await.unwrap());

        let pending = repo.pending(Platform::Linkedin, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].caption, "Hiring!");
        assert_eq!(pending[0].status, PostStatus::Pending);

        repo.set_status(&linkedin.id, PostStatus::Posted).await.unwrap();
        assert!(repo.pending(Platform::Linkedin, 10).await.unwrap().is_empty());
        assert_eq!(repo.count(Some(PostStatus::Posted)).await.unwrap(), 1);
        assert_eq!(repo.count(None).await.unwrap(), 2);

        let posted = repo
            .list(&PostQuery {
                status: Some(PostStatus::Posted),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].platform, Platform::Linkedin);
    }

    #[tokio::test]
    async fn test_clear_pending_by_platform() {
        let (db, job_id) = seeded().await;
        let repo = PostRepository::new(db.pool());
        repo.create_pending(&job_id, Platform::Linkedin, "a")
            .await
            .unwrap();
        repo.create_pending(&job_id, Platform::X, "b").await.unwrap();

        assert_eq!(repo.clear_pending(Some(Platform::X)).await.unwrap(), 1);
        assert_eq!(repo.count(Some(PostStatus::Pending)).await.unwrap(), 1);
        assert_eq!(repo.clear_pending(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_move_today_to_yesterday() {
        let (db, job_id) = seeded().await;
        let repo = PostRepository::new(db.pool());
        repo.create_pending(&job_id, Platform::Linkedin, "a")
            .await
            .unwrap();

        assert_eq!(
            repo.move_today_to_yesterday(Platform::Linkedin).await.unwrap(),
            1
        );
        let post = &repo.list(&PostQuery::default()).await.unwrap()[0];
        assert_eq!(post.created_at, start_of_yesterday());
    }
}
