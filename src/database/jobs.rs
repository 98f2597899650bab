// src/database/jobs.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use super::new_id;
use crate::jobs::{Job, Seniority, StoredJob};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    source: String,
    source_job_id: String,
    title: String,
    company: String,
    location: String,
    description: Option<String>,
    apply_url: String,
    skills: String,
    seniority: Option<String>,
    experience_years: Option<i64>,
    remote: bool,
    employment_type: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for StoredJob {
    fn from(row: JobRow) -> Self {
        let skills = serde_json::from_str(&row.skills).unwrap_or_else(|e| {
            warn!("Unreadable skills column for job {}: {}", row.id, e);
            Vec::new()
        });
        let seniority = row
            .seniority
            .as_deref()
            .and_then(|s| s.parse::<Seniority>().ok());

        StoredJob {
            id: row.id,
            job: Job {
                source: row.source,
                source_job_id: row.source_job_id,
                title: row.title,
                company: row.company,
                location: row.location,
                description: row.description,
                apply_url: row.apply_url,
                skills,
                seniority,
                experience_years: row.experience_years.and_then(|y| u32::try_from(y).ok()),
                remote: row.remote,
                employment_type: row.employment_type,
                created_at: row.created_at,
            },
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, source, source_job_id, title, company, location, \
     description, apply_url, skills, seniority, experience_years, remote, employment_type, \
     created_at, updated_at FROM jobs_clean";

/// Optional listing filters; text filters are case-insensitive substrings
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub company: Option<String>,
    pub location: Option<String>,
    pub skill: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: String,
    pub inserted: bool,
}

pub struct JobRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh the job identified by `(source, source_job_id)`
    pub async fn upsert(&self, job: &Job) -> Result<UpsertOutcome> {
        let skills = serde_json::to_string(&job.skills).context("Failed to serialize skills")?;
        let seniority = job.seniority.map(|s| s.as_str());
        let experience = job.experience_years.map(i64::from);
        let now = Utc::now();

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM jobs_clean WHERE source = ? AND source_job_id = ?",
        )
        .bind(&job.source)
        .bind(&job.source_job_id)
        .fetch_optional(self.pool)
        .await
        .context("Failed to look up job")?;

        if let Some(id) = existing {
            sqlx::query(
                r#"
                UPDATE jobs_clean
                SET title = ?, company = ?, location = ?, description = ?, apply_url = ?,
                    skills = ?, seniority = ?, experience_years = ?, remote = ?,
                    employment_type = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(&job.description)
            .bind(&job.apply_url)
            .bind(&skills)
            .bind(seniority)
            .bind(experience)
            .bind(job.remote)
            .bind(&job.employment_type)
            .bind(now)
            .bind(&id)
            .execute(self.pool)
            .await
            .context("Failed to update job")?;

            debug!("Updated job {} ({}:{})", id, job.source, job.source_job_id);
            return Ok(UpsertOutcome { id, inserted: false });
        }

        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO jobs_clean (
                id, source, source_job_id, title, company, location, description, apply_url,
                skills, seniority, experience_years, remote, employment_type, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&job.source)
        .bind(&job.source_job_id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.apply_url)
        .bind(&skills)
        .bind(seniority)
        .bind(experience)
        .bind(job.remote)
        .bind(&job.employment_type)
        .bind(job.created_at)
        .bind(now)
        .execute(self.pool)
        .await
        .context("Failed to insert job")?;

        debug!("Inserted job {} ({}:{})", id, job.source, job.source_job_id);
        Ok(UpsertOutcome { id, inserted: true })
    }

    pub async fn get(&self, id: &str) -> Result<Option<StoredJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .context("Failed to load job")?;
        Ok(row.map(StoredJob::from))
    }

    /// Newest first
    pub async fn list(&self, query: &JobQuery) -> Result<Vec<StoredJob>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if let Some(company) = &query.company {
            builder
                .push(" AND LOWER(company) LIKE ")
                .push_bind(format!("%{}%", company.to_lowercase()));
        }
        if let Some(location) = &query.location {
            builder
                .push(" AND LOWER(location) LIKE ")
                .push_bind(format!("%{}%", location.to_lowercase()));
        }
        if let Some(skill) = &query.skill {
            builder
                .push(" AND LOWER(skills) LIKE ")
                .push_bind(format!("%\"{}\"%", skill.to_lowercase()));
        }

        builder.push(" ORDER BY created_at DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let rows = builder
            .build_query_as::<JobRow>()
            .fetch_all(self.pool)
            .await
            .context("Failed to list jobs")?;
        Ok(rows.into_iter().map(StoredJob::from).collect())
    }

    /// Every stored job, oldest first
    pub async fn all(&self) -> Result<Vec<StoredJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!("{} ORDER BY created_at ASC", SELECT_COLUMNS))
            .fetch_all(self.pool)
            .await
            .context("Failed to load jobs")?;
        Ok(rows.into_iter().map(StoredJob::from).collect())
    }

    /// Jobs that never had a caption stored for any platform
    pub async fn without_posts(&self) -> Result<Vec<StoredJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "{} WHERE NOT EXISTS (SELECT 1 FROM posts_ready p WHERE p.job_id = jobs_clean.id) \
             ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(self.pool)
        .await
        .context("Failed to load jobs without posts")?;
        Ok(rows.into_iter().map(StoredJob::from).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs_clean")
            .fetch_one(self.pool)
            .await
            .context("Failed to count jobs")?;
        Ok(count)
    }

    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs_clean")
            .execute(self.pool)
            .await
            .context("Failed to clear jobs")?;
        Ok(result.rows_affected())
    }
}
