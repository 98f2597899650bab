// src/database/mod.rs
//! Repositories over the SQLite store, one per table

pub mod analytics;
pub mod cleanup_logs;
pub mod jobs;
pub mod posted_items;
pub mod posts;
pub mod raw_jobs;

pub use crate::core::Database;
pub use analytics::{AnalyticsMetrics, AnalyticsRecord, AnalyticsRepository};
pub use cleanup_logs::{CleanupLog, CleanupLogRepository};
pub use jobs::{JobQuery, JobRepository, UpsertOutcome};
pub use posted_items::{PostedItem, PostedItemRepository};
pub use posts::{PostQuery, PostRecord, PostRepository};
pub use raw_jobs::RawJobRepository;

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Start of the current UTC day
pub fn start_of_today() -> DateTime<Utc> {
    let today = Utc::now().date_naive();
    Utc.from_utc_datetime(&today.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Start of the previous UTC day
pub fn start_of_yesterday() -> DateTime<Utc> {
    start_of_today() - Duration::days(1)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
