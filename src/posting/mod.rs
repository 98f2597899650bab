// src/posting/mod.rs
//! Social platform posting

pub mod linkedin;
pub mod webdriver;

pub use linkedin::LinkedInPoster;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config_manager::DelayRange;
use crate::core::{AppConfig, Secrets};
use crate::jobs::Job;
use crate::types::Platform;

/// Result of a single publish attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostOutcome {
    pub success: bool,
    pub external_id: Option<String>,
    pub post_url: Option<String>,
    pub error: Option<String>,
}

impl PostOutcome {
    pub fn posted(external_id: Option<String>) -> Self {
        Self {
            success: true,
            external_id,
            ..Default::default()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait SocialPoster: Send + Sync {
    fn platform(&self) -> Platform;

    async fn post(&self, caption: &str, job: &Job, image: Option<&Path>) -> Result<PostOutcome>;

    /// Release browser sessions or connections
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Owns one poster per platform that has working credentials
pub struct PosterManager {
    posters: BTreeMap<Platform, Box<dyn SocialPoster>>,
}

impl PosterManager {
    pub fn from_config(config: &AppConfig, secrets: &Secrets) -> Self {
        let mut posters: BTreeMap<Platform, Box<dyn SocialPoster>> = BTreeMap::new();

        for platform in &config.posting.platforms {
            match platform {
                Platform::Linkedin => {
                    match (&secrets.linkedin_email, &secrets.linkedin_password) {
                        (Some(email), Some(password)) => {
                            posters.insert(
                                Platform::Linkedin,
                                Box::new(LinkedInPoster::new(
                                    &config.posting.linkedin,
                                    email.clone(),
                                    password.clone(),
                                )),
                            );
                            info!("LinkedIn poster configured");
                        }
                        _ => warn!("LinkedIn credentials not set, LinkedIn posting disabled"),
                    }
                }
                Platform::X => warn!("No poster available for X, skipping"),
            }
        }

        Self { posters }
    }

    pub fn with_posters(list: Vec<Box<dyn SocialPoster>>) -> Self {
        let posters = list.into_iter().map(|p| (p.platform(), p)).collect();
        Self { posters }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.posters.keys().copied().collect()
    }

    pub fn supports(&self, platform: Platform) -> bool {
        self.posters.contains_key(&platform)
    }

    pub async fn post(
        &self,
        platform: Platform,
        caption: &str,
        job: &Job,
        image: Option<&Path>,
    ) -> Result<PostOutcome> {
        let Some(poster) = self.posters.get(&platform) else {
            bail!("No poster configured for platform: {}", platform);
        };
        poster.post(caption, job, image).await
    }

    pub async fn close_all(&self) {
        for (platform, poster) in &self.posters {
            if let Err(e) = poster.close().await {
                warn!("Failed to close {} poster: {:#}", platform, e);
            }
        }
    }
}

/// Uniform delay in the range; an inverted range yields its minimum
pub fn random_delay(range: &DelayRange) -> Duration {
    let min = range.min_secs.max(0.0);
    let max = range.max_secs.max(min);
    let secs = if max > min {
        rand::rng().random_range(min..=max)
    } else {
        min
    };
    Duration::from_secs_f64(secs)
}
