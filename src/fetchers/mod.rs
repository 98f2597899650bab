// src/fetchers/mod.rs
//! Aggregator API clients returning raw job payloads

pub mod http;
pub mod jooble;
pub mod jsearch;
pub mod manager;

pub use http::HttpFetcher;
pub use jooble::JoobleFetcher;
pub use jsearch::JSearchFetcher;
pub use manager::FetcherManager;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One job source. Implementations log and skip failing keywords
/// instead of failing the whole fetch.
#[async_trait]
pub trait JobFetcher: Send + Sync {
    /// Source name stored alongside every payload
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<Value>>;
}
