// src/database/cleanup_logs.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use super::new_id;

#[derive(Debug, Clone, Serialize)]
pub struct CleanupLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub rows_deleted: i64,
    pub tables_cleared: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct CleanupLogRow {
    id: String,
    timestamp: DateTime<Utc>,
    action: String,
    rows_deleted: i64,
    tables_cleared: String,
}

impl From<CleanupLogRow> for CleanupLog {
    fn from(row: CleanupLogRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp,
            action: row.action,
            rows_deleted: row.rows_deleted,
            tables_cleared: serde_json::from_str(&row.tables_cleared).unwrap_or_default(),
        }
    }
}

pub struct CleanupLogRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CleanupLogRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, action: &str, rows_deleted: i64, tables: &[&str]) -> Result<CleanupLog> {
        let log = CleanupLog {
            id: new_id(),
            timestamp: Utc::now(),
            action: action.to_string(),
            rows_deleted,
            tables_cleared: tables.iter().map(|t| t.to_string()).collect(),
        };

        sqlx::query(
            r#"
            INSERT INTO cleanup_logs (id, timestamp, action, rows_deleted, tables_cleared)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(log.timestamp)
        .bind(&log.action)
        .bind(log.rows_deleted)
        .bind(serde_json::to_string(&log.tables_cleared).context("Failed to serialize table list")?)
        .execute(self.pool)
        .await
        .context("Failed to record cleanup log")?;

        Ok(log)
    }

    /// Most recent log for an action
    pub async fn last(&self, action: &str) -> Result<Option<CleanupLog>> {
        let row = sqlx::query_as::<_, CleanupLogRow>(
            r#"
            SELECT id, timestamp, action, rows_deleted, tables_cleared
            FROM cleanup_logs
            WHERE action = ?
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(action)
        .fetch_optional(self.pool)
        .await
        .context("Failed to load cleanup log")?;
        Ok(row.map(CleanupLog::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;

    #[tokio::test]
    async fn test_last_returns_newest_for_action() {
        let db = Database::in_memory().await.unwrap();
        let repo = CleanupLogRepository::new(db.pool());

        assert!(repo.last("monthly_cleanup").await.unwrap().is_none());
        repo.record("monthly_cleanup", 3, &["jobs_raw"]).await.unwrap();
        let newest = repo
            .record("monthly_cleanup", 7, &["jobs_raw", "jobs_clean"])
            .await
            .unwrap();

        let last = repo.last("monthly_cleanup").await.unwrap().unwrap();
        assert_eq!(last.id, newest.id);
        assert_eq!(last.rows_deleted, 7);
        assert_eq!(last.tables_cleared, vec!["jobs_raw", "jobs_clean"]);
        assert!(repo.last("other").await.unwrap().is_none());
    }
}
