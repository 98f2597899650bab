// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::core::{ConfigManager, Database, FsOps};
use crate::database::{AnalyticsRepository, JobQuery, JobRepository, PostQuery, PostRepository};
use crate::orchestrator::Orchestrator;
use crate::types::{Platform, PostStatus};
use crate::web::start_web_server;

const DEFAULT_CONFIG: &str = r#"database:
  path: data/jobcast.db

job_sources:
  rapidapi:
    enabled: true
    jsearch:
      keywords: ["fresher software developer", "entry level data analyst"]
      location: India
      max_results: 100
  aggregators:
    jooble:
      enabled: true
      keywords: ["fresher", "graduate trainee"]
      location: India
      max_results: 200

job_filters:
  allowed_locations: ["India", "Remote"]
  required_skills: []
  excluded_seniority: ["senior", "expert"]
  max_experience_years: 2

posting:
  platforms: [linkedin]
  schedule:
    linkedin: ["09:30", "13:00", "18:00"]
  max_posts_per_day:
    linkedin: 4
  delay_between_posts:
    min_secs: 30
    max_secs: 90
  image_path: applybutton.gif

image_generation:
  enabled: false

logging:
  directory: logs
  level: info
"#;

#[derive(Parser)]
#[command(name = "jobcast")]
#[command(about = "Fetch entry-level jobs, caption them and publish to social platforms")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a starter config.yaml and create the database
    Init,
    /// Show counts, sources and daily posting budgets
    Status,
    /// Fetch, process and caption jobs once
    Fetch,
    /// Publish pending posts within the daily limit
    Post {
        #[arg(long)]
        platform: Option<Platform>,
    },
    /// Create captions for stored jobs that have none
    GenerateCaptions,
    /// List stored jobs
    ListJobs {
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        skills: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// List generated posts
    ListPosts {
        #[arg(long)]
        platform: Option<Platform>,
        #[arg(long)]
        status: Option<PostStatus>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show collected analytics snapshots
    Analytics {
        #[arg(long)]
        platform: Option<Platform>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Clear all job and post tables
    Cleanup {
        /// Run even if the last cleanup is recent
        #[arg(long)]
        force: bool,
    },
    /// Move today's posts to yesterday so the daily limit starts over
    ResetDaily {
        #[arg(long, default_value = "linkedin")]
        platform: Platform,
    },
    /// Delete posts that are still pending
    ClearPending {
        #[arg(long)]
        platform: Option<Platform>,
    },
    /// Run the scheduler until Ctrl-C
    Start,
    /// Serve the read-only HTTP API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Write the starter configuration unless one already exists
pub async fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    FsOps::write_bytes_safe(path, DEFAULT_CONFIG.as_bytes()).await?;
    Ok(true)
}

pub async fn handle_command(cli: Cli, manager: ConfigManager) -> Result<()> {
    match cli.command {
        Command::Init => {
            let db = Database::connect(&manager.config.database.path).await?;
            db.close().await;
            println!(
                "✅ Database initialized at {}",
                manager.config.database.path.display()
            );
        }

        Command::Status => {
            let orchestrator = Orchestrator::from_config(&manager).await?;
            let status = orchestrator.status().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("Failed to render status")?
            );
            orchestrator.close().await;
        }

        Command::Fetch => {
            let orchestrator = Orchestrator::from_config(&manager).await?;
            let summary = orchestrator.fetch_and_process().await;
            orchestrator.close().await;
            let summary = summary?;
            println!(
                "✅ {} new jobs, {} updated, {} captions created",
                summary.pipeline.inserted.len(),
                summary.pipeline.updated.len(),
                summary.captions_created
            );
            for report in summary.posting {
                println!("   {}: {} posted, {} failed", report.platform, report.posted, report.failed);
            }
        }

        Command::Post { platform } => {
            let orchestrator = Orchestrator::from_config(&manager).await?;
            let reports = orchestrator.post_pending(platform).await;
            orchestrator.close().await;
            for report in reports? {
                println!(
                    "{}: {} posted, {} failed, {} remaining today",
                    report.platform, report.posted, report.failed, report.remaining_today
                );
            }
        }

        Command::GenerateCaptions => {
            let orchestrator = Orchestrator::from_config(&manager).await?;
            let created = orchestrator.generate_missing_captions().await;
            orchestrator.close().await;
            println!("✅ Created {} pending posts", created?);
        }

        Command::ListJobs {
            company,
            location,
            skills,
            limit,
        } => {
            let db = Database::connect(&manager.config.database.path).await?;
            let jobs = JobRepository::new(db.pool())
                .list(&JobQuery {
                    company,
                    location,
                    skill: skills,
                    limit: Some(limit),
                })
                .await?;
            println!("📋 {} jobs", jobs.len());
            for stored in jobs {
                let job = &stored.job;
                println!("   {} | {} | {} | {}", job.title, job.company, job.location, job.skills.join(", "));
                println!("     {}", job.apply_url);
            }
            db.close().await;
        }

        Command::ListPosts {
            platform,
            status,
            limit,
        } => {
            let db = Database::connect(&manager.config.database.path).await?;
            let posts = PostRepository::new(db.pool())
                .list(&PostQuery {
                    platform,
                    status,
                    limit: Some(limit),
                })
                .await?;
            println!("📋 {} posts", posts.len());
            for post in posts {
                let preview: String = post.caption.chars().take(80).collect();
                println!(
                    "   [{}] {} {} {}",
                    post.status,
                    post.platform,
                    post.created_at.format("%Y-%m-%d %H:%M"),
                    preview.replace('\n', " ")
                );
            }
            db.close().await;
        }

        Command::Analytics { platform, limit } => {
            let db = Database::connect(&manager.config.database.path).await?;
            let records = AnalyticsRepository::new(db.pool())
                .list(platform, Some(limit))
                .await?;
            println!("📊 {} snapshots", records.len());
            for record in records {
                println!(
                    "   {} {} impressions={:?} likes={:?} comments={:?} shares={:?}",
                    record.post_id,
                    record.collected_at.format("%Y-%m-%d %H:%M"),
                    record.impressions,
                    record.likes,
                    record.comments,
                    record.shares
                );
            }
            db.close().await;
        }

        Command::Cleanup { force } => {
            let orchestrator = Orchestrator::from_config(&manager).await?;
            let log = orchestrator.monthly_cleanup(force).await;
            orchestrator.close().await;
            match log? {
                Some(log) => println!(
                    "🧹 Removed {} rows from {}",
                    log.rows_deleted,
                    log.tables_cleared.join(", ")
                ),
                None => println!("Cleanup skipped, last run is recent (use --force)"),
            }
        }

        Command::ResetDaily { platform } => {
            let orchestrator = Orchestrator::from_config(&manager).await?;
            let moved = orchestrator.reset_daily_count(platform).await;
            orchestrator.close().await;
            println!("✅ Reset {} daily count ({} posts moved)", platform, moved?);
        }

        Command::ClearPending { platform } => {
            let orchestrator = Orchestrator::from_config(&manager).await?;
            let removed = orchestrator.clear_pending(platform).await;
            orchestrator.close().await;
            println!("🗑️  Removed {} pending posts", removed?);
        }

        Command::Start => {
            info!("Starting jobcast scheduler");
            let orchestrator = Arc::new(Orchestrator::from_config(&manager).await?);
            orchestrator.start().await?;
        }

        Command::Serve { port } => {
            let mut settings = manager.config.server.clone();
            if let Some(port) = port {
                settings.port = port;
            }
            let orchestrator = Arc::new(Orchestrator::from_config(&manager).await?);
            start_web_server(orchestrator.clone(), &settings).await?;
            orchestrator.close().await;
        }
    }

    Ok(())
}
