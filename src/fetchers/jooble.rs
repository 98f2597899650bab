// src/fetchers/jooble.rs
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info};

use super::{HttpFetcher, JobFetcher};
use crate::core::config_manager::JoobleConfig;

pub struct JoobleFetcher {
    http: HttpFetcher,
    api_key: String,
    config: JoobleConfig,
}

impl JoobleFetcher {
    pub const SOURCE: &'static str = "jooble";

    pub fn new(http: HttpFetcher, config: &JoobleConfig, api_key: String) -> Self {
        Self {
            http,
            api_key,
            config: config.clone(),
        }
    }

    async fn fetch_keyword(&self, keyword: &str) -> Result<Vec<Value>> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.api_key
        );
        let body = json!({
            "keywords": keyword,
            "location": self.config.location,
            "page": 1,
        });

        let response = self.http.post_json(&url, &body, &[]).await?;
        let jobs = response
            .get("jobs")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        info!("Fetched {} Jooble jobs for keyword: {}", jobs.len(), keyword);
        Ok(jobs)
    }
}

#[async_trait]
impl JobFetcher for JoobleFetcher {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    async fn fetch(&self) -> Result<Vec<Value>> {
        let mut jobs = Vec::new();
        for keyword in &self.config.keywords {
            if jobs.len() >= self.config.max_results {
                break;
            }
            match self.fetch_keyword(keyword).await {
                Ok(batch) => jobs.extend(batch),
                Err(e) => error!("Error fetching Jooble jobs for keyword {}: {:#}", keyword, e),
            }
        }
        jobs.truncate(self.config.max_results);
        Ok(jobs)
    }
}
