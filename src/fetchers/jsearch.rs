// src/fetchers/jsearch.rs
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use super::{HttpFetcher, JobFetcher};
use crate::core::config_manager::{RapidApiConfig, SearchQuery};

/// JSearch on RapidAPI (Indeed, LinkedIn and Glassdoor listings)
pub struct JSearchFetcher {
    http: HttpFetcher,
    api_key: String,
    base_url: String,
    host: String,
    query: SearchQuery,
}

impl JSearchFetcher {
    pub const SOURCE: &'static str = "jsearch";

    pub fn new(http: HttpFetcher, config: &RapidApiConfig, api_key: String) -> Self {
        Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            host: config.host.clone(),
            query: config.jsearch.clone(),
        }
    }

    /// Results kept per keyword so the whole run stays under `max_results`
    fn per_keyword_cap(&self) -> usize {
        self.query.max_results / self.query.keywords.len().max(1)
    }

    async fn fetch_keyword(&self, keyword: &str) -> Result<Vec<Value>> {
        let params = [
            ("query", keyword.to_string()),
            ("page", "1".to_string()),
            ("num_pages", "1".to_string()),
            ("country", self.query.country.clone()),
            ("location", self.query.location.clone()),
        ];
        let headers = [
            ("X-RapidAPI-Key", self.api_key.as_str()),
            ("X-RapidAPI-Host", self.host.as_str()),
        ];

        let response = self
            .http
            .get_json(&format!("{}/search", self.base_url), &params, &headers)
            .await?;

        let jobs = response
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        info!("Fetched {} JSearch jobs for keyword: {}", jobs.len(), keyword);

        Ok(jobs.into_iter().take(self.per_keyword_cap()).collect())
    }
}

#[async_trait]
impl JobFetcher for JSearchFetcher {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    async fn fetch(&self) -> Result<Vec<Value>> {
        let mut jobs = Vec::new();
        for keyword in &self.query.keywords {
            match self.fetch_keyword(keyword).await {
                Ok(batch) => jobs.extend(batch),
                Err(e) => error!("Error fetching JSearch jobs for keyword {}: {:#}", keyword, e),
            }
        }
        Ok(jobs)
    }
}
