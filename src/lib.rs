pub mod captions;
pub mod cli;
pub mod core;
pub mod database;
pub mod fetchers;
pub mod images;
pub mod jobs;
pub mod orchestrator;
pub mod posting;
pub mod types;
pub mod web;

pub use crate::core::{AppConfig, ConfigManager, Database};
pub use orchestrator::{Orchestrator, SystemStatus};
pub use web::start_web_server;
