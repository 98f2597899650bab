// src/fetchers/manager.rs
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use super::{HttpFetcher, JSearchFetcher, JobFetcher, JoobleFetcher};
use crate::core::{AppConfig, Secrets};

pub struct FetcherManager {
    fetchers: Vec<Box<dyn JobFetcher>>,
}

impl FetcherManager {
    /// Build every enabled source whose API key is present
    pub fn from_config(config: &AppConfig, secrets: &Secrets) -> Result<Self> {
        let sources = &config.job_sources;
        let http = HttpFetcher::new(sources.retry.clone())?;
        let mut fetchers: Vec<Box<dyn JobFetcher>> = Vec::new();

        if sources.rapidapi.enabled && sources.rapidapi.jsearch.enabled {
            match &secrets.rapidapi_key {
                Some(key) => fetchers.push(Box::new(JSearchFetcher::new(
                    http.clone(),
                    &sources.rapidapi,
                    key.clone(),
                ))),
                None => warn!("RapidAPI source enabled but RAPIDAPI_KEY is not set"),
            }
        }

        if sources.aggregators.jooble.enabled {
            match &secrets.jooble_api_key {
                Some(key) => fetchers.push(Box::new(JoobleFetcher::new(
                    http.clone(),
                    &sources.aggregators.jooble,
                    key.clone(),
                ))),
                None => warn!("Jooble source enabled but JOOBLE_API_KEY is not set"),
            }
        }

        let manager = Self::with_fetchers(fetchers);
        info!("Initialized job sources: {:?}", manager.enabled_sources());
        Ok(manager)
    }

    pub fn with_fetchers(fetchers: Vec<Box<dyn JobFetcher>>) -> Self {
        Self { fetchers }
    }

    pub fn enabled_sources(&self) -> Vec<String> {
        self.fetchers.iter().map(|f| f.name().to_string()).collect()
    }

    /// Raw payloads per source; a failing source is logged and left out
    pub async fn fetch_all(&self) -> BTreeMap<String, Vec<Value>> {
        let mut results = BTreeMap::new();

        for fetcher in &self.fetchers {
            match fetcher.fetch().await {
                Ok(jobs) => {
                    info!("Fetched {} jobs from {}", jobs.len(), fetcher.name());
                    results
                        .entry(fetcher.name().to_string())
                        .or_insert_with(Vec::new)
                        .extend(jobs);
                }
                Err(e) => error!("Error fetching from {}: {:#}", fetcher.name(), e),
            }
        }

        results
    }
}
