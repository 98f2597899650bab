// src/core/database.rs
//! SQLite connection management and schema setup

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::core::FsOps;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs_raw (
        id TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        fetched_at TEXT NOT NULL,
        payload TEXT NOT NULL,
        UNIQUE (source, payload)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS jobs_clean (
        id TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        source_job_id TEXT NOT NULL,
        title TEXT NOT NULL,
        company TEXT NOT NULL,
        location TEXT NOT NULL DEFAULT '',
        description TEXT,
        apply_url TEXT NOT NULL,
        skills TEXT NOT NULL DEFAULT '[]',
        seniority TEXT,
        experience_years INTEGER,
        remote BOOLEAN NOT NULL DEFAULT FALSE,
        employment_type TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (source, source_job_id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts_ready (
        id TEXT PRIMARY KEY,
        job_id TEXT NOT NULL REFERENCES jobs_clean(id),
        platform TEXT NOT NULL,
        caption TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        scheduled_for TEXT,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posted_items (
        id TEXT PRIMARY KEY,
        job_id TEXT NOT NULL REFERENCES jobs_clean(id),
        platform TEXT NOT NULL,
        posted_at TEXT NOT NULL,
        external_post_id TEXT,
        post_url TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS analytics (
        id TEXT PRIMARY KEY,
        post_id TEXT NOT NULL REFERENCES posted_items(id),
        collected_at TEXT NOT NULL,
        impressions INTEGER,
        likes INTEGER,
        comments INTEGER,
        shares INTEGER,
        clicks INTEGER
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cleanup_logs (
        id TEXT PRIMARY KEY,
        timestamp TEXT NOT NULL,
        action TEXT NOT NULL,
        rows_deleted INTEGER NOT NULL,
        tables_cleared TEXT NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_clean_apply_url ON jobs_clean(apply_url);",
    "CREATE INDEX IF NOT EXISTS idx_jobs_clean_seniority ON jobs_clean(seniority);",
    "CREATE INDEX IF NOT EXISTS idx_posts_ready_status ON posts_ready(status);",
    "CREATE INDEX IF NOT EXISTS idx_posts_ready_platform ON posts_ready(platform);",
    "CREATE INDEX IF NOT EXISTS idx_posts_ready_job_id ON posts_ready(job_id);",
    "CREATE INDEX IF NOT EXISTS idx_posted_items_platform ON posted_items(platform);",
    "CREATE INDEX IF NOT EXISTS idx_posted_items_posted_at ON posted_items(posted_at);",
    "CREATE INDEX IF NOT EXISTS idx_analytics_post_id ON analytics(post_id);",
];

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations
    pub async fn connect(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            FsOps::ensure_dir_exists(parent).await?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await.with_context(|| {
            format!("Failed to connect to database: {}", database_path.display())
        })?;

        info!("Database connection established: {}", database_path.display());

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database; a single connection keeps every query on the same store
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply schema statement")?;
        }

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_database_is_created_and_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobs.db");

        let db = Database::connect(&path).await.unwrap();
        db.health_check().await.unwrap();
        db.close().await;

        assert!(path.exists());
        let reopened = Database::connect(&path).await.unwrap();
        reopened.health_check().await.unwrap();
    }
}
