// src/core/mod.rs
//! Core services shared by the pipeline, the scheduler and the web API

pub mod config_manager;
pub mod database;
pub mod fs_ops;

pub use config_manager::{AppConfig, ConfigManager, Secrets};
pub use database::Database;
pub use fs_ops::FsOps;
