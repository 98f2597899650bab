// src/jobs/mod.rs
//! Normalization, deduplication and filtering of fetched postings

pub mod dedup;
pub mod filters;
pub mod model;
pub mod normalizer;
pub mod processor;

pub use filters::{JobFilters, Rejection};
pub use model::{Job, Seniority, StoredJob};
pub use normalizer::JobNormalizer;
pub use processor::{JobProcessor, PipelineReport};
