// src/core/config_manager.rs
//! config.yaml plus environment secrets

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::FsOps;
use crate::jobs::JobFilters;
use crate::types::Platform;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    pub job_sources: JobSourcesConfig,
    pub job_filters: JobFilters,
    pub dedup: DedupConfig,
    pub llm: LlmConfig,
    pub posting: PostingConfig,
    pub image_generation: ImageGenerationConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/jobcast.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobSourcesConfig {
    pub rapidapi: RapidApiConfig,
    pub aggregators: AggregatorsConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RapidApiConfig {
    pub enabled: bool,
    pub base_url: String,
    pub host: String,
    #[serde(alias = "indeed")]
    pub jsearch: SearchQuery,
}

impl Default for RapidApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://jsearch.p.rapidapi.com".to_string(),
            host: "jsearch.p.rapidapi.com".to_string(),
            jsearch: SearchQuery::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AggregatorsConfig {
    pub jooble: JoobleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JoobleConfig {
    pub enabled: bool,
    pub base_url: String,
    pub keywords: Vec<String>,
    pub location: String,
    pub max_results: usize,
}

impl Default for JoobleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://jooble.org/api".to_string(),
            keywords: Vec::new(),
            location: "India".to_string(),
            max_results: 200,
        }
    }
}

/// Keyword search against one endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub enabled: bool,
    pub keywords: Vec<String>,
    pub location: String,
    pub country: String,
    pub max_results: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: Vec::new(),
            location: "India".to_string(),
            country: "in".to_string(),
            max_results: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 4_000,
            max_delay_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub title_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_threshold: crate::jobs::dedup::DEFAULT_TITLE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            max_tokens: 500,
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub max_length: usize,
    pub hashtag_count: usize,
    pub tone: String,
    pub audience: String,
}

impl CaptionConfig {
    pub fn defaults_for(platform: Platform) -> Self {
        match platform {
            Platform::Linkedin => Self {
                max_length: 1300,
                hashtag_count: 4,
                tone: "professional".to_string(),
                audience: "Indian tech professionals".to_string(),
            },
            Platform::X => Self {
                max_length: 280,
                hashtag_count: 2,
                tone: "casual".to_string(),
                audience: "tech community".to_string(),
            },
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self::defaults_for(Platform::Linkedin)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_secs: 30.0,
            max_secs: 90.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkedInSettings {
    pub webdriver_url: String,
    pub base_url: String,
    pub headless: bool,
    pub wait_timeout_secs: u64,
    pub step_delay: DelayRange,
}

impl Default for LinkedInSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            base_url: "https://www.linkedin.com".to_string(),
            headless: false,
            wait_timeout_secs: 20,
            step_delay: DelayRange {
                min_secs: 1.0,
                max_secs: 3.0,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    pub platforms: Vec<Platform>,
    /// "HH:MM" posting slots per platform
    pub schedule: BTreeMap<Platform, Vec<String>>,
    pub max_posts_per_day: BTreeMap<Platform, u32>,
    pub delay_between_posts: DelayRange,
    pub captions: BTreeMap<Platform, CaptionConfig>,
    pub image_path: Option<PathBuf>,
    pub post_after_fetch: bool,
    pub linkedin: LinkedInSettings,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            platforms: vec![Platform::Linkedin],
            schedule: BTreeMap::new(),
            max_posts_per_day: BTreeMap::new(),
            delay_between_posts: DelayRange::default(),
            captions: BTreeMap::new(),
            image_path: Some(PathBuf::from("applybutton.gif")),
            post_after_fetch: true,
            linkedin: LinkedInSettings::default(),
        }
    }
}

impl PostingConfig {
    pub const DEFAULT_MAX_POSTS_PER_DAY: u32 = 4;

    pub fn max_posts_for(&self, platform: Platform) -> u32 {
        self.max_posts_per_day
            .get(&platform)
            .copied()
            .unwrap_or(Self::DEFAULT_MAX_POSTS_PER_DAY)
    }

    pub fn caption_config(&self, platform: Platform) -> CaptionConfig {
        self.captions
            .get(&platform)
            .cloned()
            .unwrap_or_else(|| CaptionConfig::defaults_for(platform))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageGenerationConfig {
    pub enabled: bool,
    pub model: String,
    pub output_dir: PathBuf,
    pub max_age_hours: u64,
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gemini-2.0-flash-preview-image-generation".to_string(),
            output_dir: PathBuf::from("generated_images"),
            max_age_hours: 24,
        }
    }
}

/// Six-field cron expressions (seconds first), evaluated in UTC
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub fetch_cron: String,
    pub analytics_cron: String,
    pub cleanup_cron: String,
    pub cleanup_interval_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fetch_cron: "0 0 */6 * * *".to_string(),
            analytics_cron: "0 0 */2 * * *".to_string(),
            cleanup_cron: "0 0 2 1 * *".to_string(),
            cleanup_interval_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "jobcast.log".to_string(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// API keys and credentials, only ever read from the environment
#[derive(Clone, Default)]
pub struct Secrets {
    pub rapidapi_key: Option<String>,
    pub jooble_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub linkedin_email: Option<String>,
    pub linkedin_password: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "set" } else { "unset" };
        f.debug_struct("Secrets")
            .field("rapidapi_key", &mask(&self.rapidapi_key))
            .field("jooble_api_key", &mask(&self.jooble_api_key))
            .field("google_api_key", &mask(&self.google_api_key))
            .field("linkedin_email", &mask(&self.linkedin_email))
            .field("linkedin_password", &mask(&self.linkedin_password))
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            rapidapi_key: env_non_empty("RAPIDAPI_KEY"),
            jooble_api_key: env_non_empty("JOOBLE_API_KEY"),
            google_api_key: env_non_empty("GOOGLE_API_KEY"),
            linkedin_email: env_non_empty("LINKEDIN_EMAIL"),
            linkedin_password: env_non_empty("LINKEDIN_PASSWORD"),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub config: AppConfig,
    pub secrets: Secrets,
    pub config_path: PathBuf,
    /// `.env` file picked up by `load`, if any
    pub env_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load `.env`, then the YAML file, then apply environment overrides
    ///
    /// Runs before logging is set up; call `log_loaded` once the subscriber exists.
    pub fn load(config_path: &Path) -> Result<Self> {
        let env_file = dotenvy::dotenv().ok();

        if !config_path.exists() {
            anyhow::bail!(
                "{} not found. The automation cannot start without configuration.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        Self::apply_env_overrides(&mut config);

        Ok(Self {
            config,
            secrets: Secrets::from_env(),
            config_path: config_path.to_path_buf(),
            env_file,
        })
    }

    pub fn env_status(&self) -> String {
        match &self.env_file {
            Some(path) => format!("Environment variables loaded from {}", path.display()),
            None => "No .env file found, using process environment only".to_string(),
        }
    }

    pub fn log_loaded(&self) {
        if self.env_file.is_some() {
            info!("{}", self.env_status());
        } else {
            warn!("{}", self.env_status());
        }
        info!("Loaded configuration from {}", self.config_path.display());
        info!("Database: {}", self.config.database.path.display());
        info!("Secrets: {:?}", self.secrets);
    }

    pub fn parse(content: &str) -> Result<AppConfig> {
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        serde_yaml::from_str(content).context("Invalid configuration YAML")
    }

    fn apply_env_overrides(config: &mut AppConfig) {
        if let Some(path) = env_non_empty("DATABASE_PATH") {
            config.database.path = PathBuf::from(path);
        }
        if let Some(url) = env_non_empty("WEBDRIVER_URL") {
            config.posting.linkedin.webdriver_url = url;
        }
        if let Some(url) = env_non_empty("GEMINI_API_URL") {
            config.llm.base_url = url;
        }
    }

    /// Create the directories the configured paths point into
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(db_parent) = self.config.database.path.parent() {
            FsOps::ensure_dir_exists(db_parent).await?;
        }
        FsOps::ensure_dir_exists(&self.config.logging.directory).await?;
        if self.config.image_generation.enabled {
            FsOps::ensure_dir_exists(&self.config.image_generation.output_dir).await?;
        }
        Ok(())
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.config
            .logging
            .directory
            .join(&self.config.logging.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defers_env_status_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "logging:\n  level: debug\n").unwrap();

        let mut manager = ConfigManager::load(&path).unwrap();
        assert_eq!(manager.config_path, path);
        assert_eq!(manager.config.logging.level, "debug");

        manager.env_file = Some(PathBuf::from("/srv/jobcast/.env"));
        assert_eq!(
            manager.env_status(),
            "Environment variables loaded from /srv/jobcast/.env"
        );
        manager.env_file = None;
        assert!(manager.env_status().starts_with("No .env file found"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConfigManager::parse("").unwrap();
        assert_eq!(config.posting.platforms, vec![Platform::Linkedin]);
        assert_eq!(config.posting.max_posts_for(Platform::Linkedin), 4);
        assert_eq!(config.posting.caption_config(Platform::X).max_length, 280);
        assert_eq!(config.job_sources.retry.attempts, 3);
        assert!(config.job_filters.allowed_locations.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
database:
  path: /tmp/jobs.db
job_sources:
  rapidapi:
    enabled: true
    indeed:
      keywords: ["python developer", "data analyst"]
      max_results: 50
  aggregators:
    jooble:
      enabled: true
      keywords: ["fresher"]
job_filters:
  allowed_locations: ["India", "Remote"]
  required_skills: ["python"]
  excluded_seniority: ["senior", "expert"]
  max_experience_years: 2
posting:
  platforms: [linkedin]
  schedule:
    linkedin: ["09:30", "18:00"]
  max_posts_per_day:
    linkedin: 6
  captions:
    linkedin:
      max_length: 1000
      hashtag_count: 3
      tone: friendly
      audience: graduates
"#;
        let config = ConfigManager::parse(yaml).unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/jobs.db"));
        assert!(config.job_sources.rapidapi.enabled);
        assert_eq!(config.job_sources.rapidapi.jsearch.keywords.len(), 2);
        assert_eq!(config.job_sources.rapidapi.jsearch.max_results, 50);
        assert_eq!(config.job_sources.rapidapi.jsearch.country, "in");
        assert_eq!(config.job_sources.aggregators.jooble.max_results, 200);
        assert_eq!(config.job_filters.max_experience_years, Some(2));
        assert_eq!(config.posting.max_posts_for(Platform::Linkedin), 6);
        assert_eq!(
            config.posting.schedule[&Platform::Linkedin],
            vec!["09:30", "18:00"]
        );
        let captions = config.posting.caption_config(Platform::Linkedin);
        assert_eq!((captions.max_length, captions.hashtag_count), (1000, 3));
    }

    #[test]
    fn test_secrets_debug_hides_values() {
        let secrets = Secrets {
            google_api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("google_api_key: \"set\""));
    }
}
