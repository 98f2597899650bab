// src/jobs/processor.rs
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::dedup::deduplicate_against;
use super::filters::JobFilters;
use super::model::Job;
use super::normalizer::JobNormalizer;
use crate::core::Database;
use crate::database::{JobRepository, RawJobRepository};

/// Raw payloads keyed by source name
pub type RawJobs = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub raw_received: usize,
    pub raw_stored: usize,
    pub normalized: usize,
    pub duplicates_removed: usize,
    pub filtered_out: usize,
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
}

impl PipelineReport {
    pub fn stored(&self) -> usize {
        self.inserted.len() + self.updated.len()
    }
}

pub struct JobProcessor {
    db: Database,
    normalizer: JobNormalizer,
    filters: JobFilters,
    title_threshold: f64,
}

impl JobProcessor {
    pub fn new(db: Database, filters: JobFilters, title_threshold: f64) -> Result<Self> {
        Ok(Self {
            db,
            normalizer: JobNormalizer::new()?,
            filters,
            title_threshold,
        })
    }

    /// Normalize every payload of every source, dropping unusable records
    pub fn process_raw_jobs(&self, raw: &RawJobs) -> Vec<Job> {
        raw.iter()
            .flat_map(|(source, payloads)| {
                payloads
                    .iter()
                    .filter_map(move |payload| self.normalizer.normalize(payload, source))
            })
            .collect()
    }

    /// Store raw payloads, then normalize, deduplicate against the store, filter and upsert
    pub async fn run_pipeline(&self, raw: &RawJobs) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        let raw_repo = RawJobRepository::new(self.db.pool());

        for (source, payloads) in raw {
            report.raw_received += payloads.len();
            for payload in payloads {
                match raw_repo.insert_if_new(source, payload).await {
                    Ok(true) => report.raw_stored += 1,
                    Ok(false) => {}
                    Err(e) => warn!("Failed to store raw {} job: {:#}", source, e),
                }
            }
        }

        let normalized = self.process_raw_jobs(raw);
        report.normalized = normalized.len();

        let job_repo = JobRepository::new(self.db.pool());
        let known: Vec<Job> = job_repo.all().await?.into_iter().map(|s| s.job).collect();
        let fresh = deduplicate_against(&known, normalized, self.title_threshold);
        report.duplicates_removed = report.normalized - fresh.len();

        let accepted = self.filters.filter(fresh);
        report.filtered_out = report.normalized - report.duplicates_removed - accepted.len();

        for job in &accepted {
            match job_repo.upsert(job).await {
                Ok(outcome) if outcome.inserted => report.inserted.push(outcome.id),
                Ok(outcome) => report.updated.push(outcome.id),
                Err(e) => warn!(
                    "Failed to store job {} at {}: {:#}",
                    job.title, job.company, e
                ),
            }
        }

        info!(
            "Pipeline: {} raw received, {} new raw, {} normalized, {} duplicates, {} filtered out, {} inserted, {} updated",
            report.raw_received,
            report.raw_stored,
            report.normalized,
            report.duplicates_removed,
            report.filtered_out,
            report.inserted.len(),
            report.updated.len()
        );
        Ok(report)
    }
}
