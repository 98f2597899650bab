// src/orchestrator.rs
//! Workflows tying fetching, processing, captioning and posting together,
//! plus the cron schedule that drives them

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::captions::{CaptionGenerator, GeminiClient, ImageGenerator, TextGenerator};
use crate::core::{AppConfig, ConfigManager, Database, FsOps};
use crate::database::{
    start_of_today, AnalyticsMetrics, AnalyticsRepository, CleanupLog, CleanupLogRepository,
    JobRepository, PostQuery, PostRepository, PostedItemRepository, RawJobRepository,
};
use crate::fetchers::FetcherManager;
use crate::images::ImageService;
use crate::jobs::{JobProcessor, PipelineReport, StoredJob};
use crate::posting::{random_delay, PosterManager};
use crate::types::{Platform, PostStatus};

const MONTHLY_CLEANUP: &str = "monthly_cleanup";
const ANALYTICS_MIN_INTERVAL_HOURS: i64 = 2;
const CLEARED_TABLES: [&str; 5] = [
    "analytics",
    "posted_items",
    "posts_ready",
    "jobs_clean",
    "jobs_raw",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchSummary {
    pub pipeline: PipelineReport,
    pub captions_created: usize,
    pub posting: Vec<PostingReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostingReport {
    pub platform: Platform,
    pub posted: usize,
    pub failed: usize,
    pub remaining_today: i64,
}

impl PostingReport {
    fn new(platform: Platform, remaining_today: i64) -> Self {
        Self {
            platform,
            posted: 0,
            failed: 0,
            remaining_today,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStatus {
    pub poster_available: bool,
    pub posted_today: i64,
    pub daily_limit: u32,
    pub pending: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub database_healthy: bool,
    pub raw_jobs: i64,
    pub clean_jobs: i64,
    pub pending_posts: i64,
    pub posted_posts: i64,
    pub failed_posts: i64,
    pub posted_items: i64,
    pub analytics_snapshots: i64,
    pub enabled_sources: Vec<String>,
    pub platforms: BTreeMap<Platform, PlatformStatus>,
    pub last_cleanup: Option<DateTime<Utc>>,
}

pub struct Orchestrator {
    config: AppConfig,
    db: Database,
    fetchers: FetcherManager,
    processor: JobProcessor,
    captions: CaptionGenerator,
    images: Option<ImageService>,
    posters: PosterManager,
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        db: Database,
        fetchers: FetcherManager,
        captions: CaptionGenerator,
        posters: PosterManager,
    ) -> Result<Self> {
        let processor = JobProcessor::new(
            db.clone(),
            config.job_filters.clone(),
            config.dedup.title_threshold,
        )?;

        Ok(Self {
            config,
            db,
            fetchers,
            processor,
            captions,
            images: None,
            posters,
        })
    }

    pub fn with_images(mut self, images: ImageService) -> Self {
        self.images = Some(images);
        self
    }

    /// Wire every collaborator from the loaded configuration and environment
    pub async fn from_config(manager: &ConfigManager) -> Result<Self> {
        let config = manager.config.clone();
        let secrets = &manager.secrets;

        let db = Database::connect(&config.database.path).await?;
        let fetchers = FetcherManager::from_config(&config, secrets)?;

        let gemini = match &secrets.google_api_key {
            Some(key) => {
                let mut client = GeminiClient::with_retry(
                    &config.llm,
                    key.clone(),
                    config.job_sources.retry.clone(),
                )?;
                if config.image_generation.enabled {
                    client = client.with_image_model(config.image_generation.model.clone());
                }
                Some(Arc::new(client))
            }
            None => {
                warn!("GOOGLE_API_KEY not set, using template captions");
                None
            }
        };

        let text = gemini
            .clone()
            .map(|client| client as Arc<dyn TextGenerator>);
        let captions = CaptionGenerator::new(text, &config.posting);
        let posters = PosterManager::from_config(&config, secrets);

        let images = match (&gemini, config.image_generation.enabled) {
            (Some(client), true) => Some(ImageService::new(
                client.clone() as Arc<dyn ImageGenerator>,
                &config.image_generation,
            )),
            (None, true) => {
                warn!("Image generation enabled but GOOGLE_API_KEY not set, skipping images");
                None
            }
            _ => None,
        };

        let orchestrator = Self::new(config, db, fetchers, captions, posters)?;
        Ok(match images {
            Some(images) => orchestrator.with_images(images),
            None => orchestrator,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fetch from every source, run the pipeline, caption new jobs and post right away
    pub async fn fetch_and_process(&self) -> Result<FetchSummary> {
        info!("Starting fetch and process cycle");
        let raw = self.fetchers.fetch_all().await;
        let pipeline = self.processor.run_pipeline(&raw).await?;

        let stored: Vec<String> = pipeline
            .inserted
            .iter()
            .chain(&pipeline.updated)
            .cloned()
            .collect();
        let captions_created = self.generate_captions(&stored).await?;

        let posting = if captions_created > 0 && self.config.posting.post_after_fetch {
            info!("New posts ready, posting immediately");
            self.post_pending(None).await?
        } else {
            Vec::new()
        };

        if let Some(images) = &self.images {
            if let Err(e) = images.cleanup_old_images().await {
                warn!("Image cleanup failed: {:#}", e);
            }
        }

        info!(
            "Fetch cycle complete: {} jobs stored, {} captions created",
            pipeline.stored(),
            captions_created
        );
        Ok(FetchSummary {
            pipeline,
            captions_created,
            posting,
        })
    }

    /// Create one pending post per configured platform for each job that has none yet
    pub async fn generate_captions(&self, job_ids: &[String]) -> Result<usize> {
        let jobs = JobRepository::new(self.db.pool());
        let posts = PostRepository::new(self.db.pool());
        let mut created = 0;

        for job_id in job_ids {
            let Some(stored) = jobs.get(job_id).await? else {
                warn!("Job {} not found, skipping captions", job_id);
                continue;
            };
            if posts.job_has_posts(job_id).await? {
                continue;
            }

            let captions = self.captions.generate(&stored.job).await;
            if captions.is_empty() {
                warn!("No valid caption for job: {}", stored.job.title);
                continue;
            }
            for (platform, caption) in captions {
                match posts.create_pending(job_id, platform, &caption).await {
                    Ok(_) => created += 1,
                    Err(e) => error!(
                        "Failed to store {} caption for {}: {:#}",
                        platform, stored.job.title, e
                    ),
                }
            }
        }

        info!("Created {} pending posts", created);
        Ok(created)
    }

    pub async fn generate_missing_captions(&self) -> Result<usize> {
        let ids: Vec<String> = JobRepository::new(self.db.pool())
            .without_posts()
            .await?
            .into_iter()
            .map(|stored| stored.id)
            .collect();
        info!("{} jobs without captions", ids.len());
        self.generate_captions(&ids).await
    }

    /// Publish pending posts within each platform's daily budget
    pub async fn post_pending(&self, platform: Option<Platform>) -> Result<Vec<PostingReport>> {
        let platforms = match platform {
            Some(platform) => vec![platform],
            None => self.config.posting.platforms.clone(),
        };

        let mut reports = Vec::with_capacity(platforms.len());
        for platform in platforms {
            reports.push(self.post_for_platform(platform).await?);
        }
        Ok(reports)
    }

    async fn post_for_platform(&self, platform: Platform) -> Result<PostingReport> {
        let posted_items = PostedItemRepository::new(self.db.pool());
        let posts = PostRepository::new(self.db.pool());
        let jobs = JobRepository::new(self.db.pool());

        let limit = i64::from(self.config.posting.max_posts_for(platform));
        let posted_today = posted_items.count_since(platform, start_of_today()).await?;
        let remaining = (limit - posted_today).max(0);
        let mut report = PostingReport::new(platform, remaining);

        if !self.posters.supports(platform) {
            warn!("No poster for {}, pending posts stay queued", platform);
            return Ok(report);
        }
        if remaining == 0 {
            info!(
                "Daily limit reached for {} ({}/{})",
                platform, posted_today, limit
            );
            return Ok(report);
        }

        let pending = posts.pending(platform, remaining).await?;
        info!(
            "Posting {} of {} remaining {} posts today",
            pending.len(),
            remaining,
            platform
        );

        for (index, post) in pending.iter().enumerate() {
            let Some(stored) = jobs.get(&post.job_id).await? else {
                warn!("Job {} for post {} is gone", post.job_id, post.id);
                posts.set_status(&post.id, PostStatus::Failed).await?;
                report.failed += 1;
                continue;
            };

            let image = self.image_for(&stored).await;
            match self
                .posters
                .post(platform, &post.caption, &stored.job, image.as_deref())
                .await
            {
                Ok(outcome) if outcome.success => {
                    posts.set_status(&post.id, PostStatus::Posted).await?;
                    posted_items
                        .record(
                            &post.job_id,
                            platform,
                            outcome.external_id.as_deref(),
                            outcome.post_url.as_deref(),
                        )
                        .await?;
                    report.posted += 1;
                    report.remaining_today -= 1;
                    info!("Posted {} to {}", stored.job.title, platform);
                }
                Ok(outcome) => {
                    posts.set_status(&post.id, PostStatus::Failed).await?;
                    report.failed += 1;
                    warn!(
                        "Posting {} to {} failed: {}",
                        stored.job.title,
                        platform,
                        outcome.error.as_deref().unwrap_or("unknown")
                    );
                }
                Err(e) => {
                    posts.set_status(&post.id, PostStatus::Failed).await?;
                    report.failed += 1;
                    error!("Error posting {} to {}: {:#}", stored.job.title, platform, e);
                }
            }

            if index + 1 < pending.len() {
                let delay = random_delay(&self.config.posting.delay_between_posts);
                info!("Waiting {:.1}s before next post", delay.as_secs_f64());
                sleep(delay).await;
            }
        }

        Ok(report)
    }

    /// Generated image when enabled, else the static image if it exists on disk
    async fn image_for(&self, stored: &StoredJob) -> Option<PathBuf> {
        if let Some(images) = &self.images {
            match images.generate_for_job(&stored.job, &stored.id).await {
                Ok(Some(path)) => return Some(path),
                Ok(None) => {}
                Err(e) => warn!("Image generation failed for {}: {:#}", stored.job.title, e),
            }
        }

        let path = self.config.posting.image_path.as_ref()?;
        match FsOps::validate_image(path).await {
            Ok(()) => Some(path.clone()),
            Err(e) => {
                debug!("Static image unavailable: {:#}", e);
                None
            }
        }
    }

    /// Record an engagement snapshot for posted items not sampled in the last two hours
    pub async fn collect_analytics(&self) -> Result<usize> {
        let items = PostedItemRepository::new(self.db.pool()).list(None, None).await?;
        let analytics = AnalyticsRepository::new(self.db.pool());
        let cutoff = Utc::now() - ChronoDuration::hours(ANALYTICS_MIN_INTERVAL_HOURS);
        let mut recorded = 0;

        for item in items {
            if let Some(latest) = analytics.latest_for_post(&item.id).await? {
                if latest.collected_at > cutoff {
                    continue;
                }
            }
            // Feed metrics are not exposed for LinkedIn posts
            match analytics.record(&item.id, AnalyticsMetrics::default()).await {
                Ok(_) => recorded += 1,
                Err(e) => warn!("Failed to record analytics for {}: {:#}", item.id, e),
            }
        }

        info!("Collected analytics for {} posts", recorded);
        Ok(recorded)
    }

    /// Clear every job and post table; skipped unless forced or the interval has passed
    pub async fn monthly_cleanup(&self, force: bool) -> Result<Option<CleanupLog>> {
        let pool = self.db.pool();
        let logs = CleanupLogRepository::new(pool);

        if !force {
            if let Some(last) = logs.last(MONTHLY_CLEANUP).await? {
                let interval = ChronoDuration::days(self.config.scheduler.cleanup_interval_days);
                if Utc::now() - last.timestamp < interval {
                    info!(
                        "Last cleanup at {}, skipping",
                        last.timestamp.format("%Y-%m-%d %H:%M")
                    );
                    return Ok(None);
                }
            }
        }

        info!("Starting monthly cleanup");
        let mut rows = AnalyticsRepository::new(pool).clear().await?;
        rows += PostedItemRepository::new(pool).clear().await?;
        rows += PostRepository::new(pool).clear().await?;
        rows += JobRepository::new(pool).clear().await?;
        rows += RawJobRepository::new(pool).clear().await?;

        let rows = i64::try_from(rows).context("Deleted row count overflow")?;
        let log = logs.record(MONTHLY_CLEANUP, rows, &CLEARED_TABLES).await?;
        info!("Monthly cleanup removed {} rows", rows);
        Ok(Some(log))
    }

    /// Move today's posts for a platform to yesterday so the daily budget starts over
    pub async fn reset_daily_count(&self, platform: Platform) -> Result<u64> {
        let posts = PostRepository::new(self.db.pool())
            .move_today_to_yesterday(platform)
            .await?;
        let items = PostedItemRepository::new(self.db.pool())
            .move_today_to_yesterday(platform)
            .await?;
        info!(
            "Reset daily count for {}: {} posts and {} posted items moved",
            platform, posts, items
        );
        Ok(items)
    }

    pub async fn clear_pending(&self, platform: Option<Platform>) -> Result<u64> {
        let removed = PostRepository::new(self.db.pool())
            .clear_pending(platform)
            .await?;
        info!("Cleared {} pending posts", removed);
        Ok(removed)
    }

    pub async fn status(&self) -> Result<SystemStatus> {
        let pool = self.db.pool();
        let posts = PostRepository::new(pool);
        let posted_items = PostedItemRepository::new(pool);

        let database_healthy = match self.db.health_check().await {
            Ok(()) => true,
            Err(e) => {
                error!("Database health check failed: {:#}", e);
                false
            }
        };

        let mut platforms = BTreeMap::new();
        for &platform in &self.config.posting.platforms {
            let pending = posts
                .list(&PostQuery {
                    platform: Some(platform),
                    status: Some(PostStatus::Pending),
                    limit: None,
                })
                .await?
                .len();
            platforms.insert(
                platform,
                PlatformStatus {
                    poster_available: self.posters.supports(platform),
                    posted_today: posted_items.count_since(platform, start_of_today()).await?,
                    daily_limit: self.config.posting.max_posts_for(platform),
                    pending: i64::try_from(pending).unwrap_or(i64::MAX),
                },
            );
        }

        Ok(SystemStatus {
            database_healthy,
            raw_jobs: RawJobRepository::new(pool).count().await?,
            clean_jobs: JobRepository::new(pool).count().await?,
            pending_posts: posts.count(Some(PostStatus::Pending)).await?,
            posted_posts: posts.count(Some(PostStatus::Posted)).await?,
            failed_posts: posts.count(Some(PostStatus::Failed)).await?,
            posted_items: posted_items.count().await?,
            analytics_snapshots: AnalyticsRepository::new(pool).count().await?,
            enabled_sources: self.fetchers.enabled_sources(),
            platforms,
            last_cleanup: CleanupLogRepository::new(pool)
                .last(MONTHLY_CLEANUP)
                .await?
                .map(|log| log.timestamp),
        })
    }

    /// Run the cron schedule until Ctrl-C, then release posters and the pool
    pub async fn start(self: Arc<Self>) -> Result<()> {
        let mut scheduler = JobScheduler::new()
            .await
            .context("Failed to create scheduler")?;
        let schedule = &self.config.scheduler;

        let this = self.clone();
        add_job(&scheduler, &schedule.fetch_cron, "fetch", move || {
            let this = this.clone();
            async move {
                if let Err(e) = this.fetch_and_process().await {
                    error!("Scheduled fetch failed: {:#}", e);
                }
            }
        })
        .await?;

        for (&platform, times) in &self.config.posting.schedule {
            if !self.config.posting.platforms.contains(&platform) {
                continue;
            }
            for time in times {
                let cron = daily_cron(time)?;
                let this = self.clone();
                add_job(&scheduler, &cron, &format!("{} posting", platform), move || {
                    let this = this.clone();
                    async move {
                        if let Err(e) = this.post_pending(Some(platform)).await {
                            error!("Scheduled {} posting failed: {:#}", platform, e);
                        }
                    }
                })
                .await?;
            }
        }

        let this = self.clone();
        add_job(&scheduler, &schedule.analytics_cron, "analytics", move || {
            let this = this.clone();
            async move {
                if let Err(e) = this.collect_analytics().await {
                    error!("Scheduled analytics failed: {:#}", e);
                }
            }
        })
        .await?;

        let this = self.clone();
        add_job(&scheduler, &schedule.cleanup_cron, "cleanup", move || {
            let this = this.clone();
            async move {
                if let Err(e) = this.monthly_cleanup(false).await {
                    error!("Scheduled cleanup failed: {:#}", e);
                }
            }
        })
        .await?;

        scheduler
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started (UTC)");

        if let Err(e) = self.fetch_and_process().await {
            error!("Initial fetch failed: {:#}", e);
        }

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        info!("Shutdown requested");

        if let Err(e) = scheduler.shutdown().await {
            warn!("Scheduler shutdown error: {}", e);
        }
        self.posters.close_all().await;
        self.db.close().await;
        info!("Shutdown complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.posters.close_all().await;
        self.db.close().await;
    }
}

async fn add_job<F, Fut>(scheduler: &JobScheduler, cron: &str, name: &str, task: F) -> Result<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let job = CronJob::new_async(cron, move |_uuid, _lock| Box::pin(task()))
        .with_context(|| format!("Invalid cron expression for {}: {}", name, cron))?;
    scheduler
        .add(job)
        .await
        .with_context(|| format!("Failed to schedule {}", name))?;
    info!("Scheduled {} at '{}'", name, cron);
    Ok(())
}

/// Six-field cron expression firing daily at an "HH:MM" time
pub fn daily_cron(time: &str) -> Result<String> {
    let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .with_context(|| format!("Invalid posting time '{}', expected HH:MM", time))?;
    Ok(format!("0 {} {} * * *", parsed.minute(), parsed.hour()))
}
