// src/web/handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use std::str::FromStr;
use tracing::info;

use super::types::*;
use crate::database::{
    AnalyticsRecord, AnalyticsRepository, JobQuery, JobRepository, PostQuery, PostRecord,
    PostRepository,
};
use crate::jobs::StoredJob;
use crate::orchestrator::SystemStatus;
use crate::types::{Platform, PostStatus};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn parse_optional<T: FromStr<Err = anyhow::Error>>(
    value: Option<&str>,
    suggestion: &str,
) -> Result<Option<T>, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| T::from_str(v).map_err(|e| bad_request(e.to_string(), suggestion)))
        .transpose()
}

pub async fn health_handler(state: &State<ApiState>) -> Json<DataResponse<HealthData>> {
    let database = state.orchestrator.database().health_check().await.is_ok();
    Json(DataResponse::success(
        "Service is running",
        HealthData {
            status: if database { "ok" } else { "degraded" },
            database,
            version: env!("CARGO_PKG_VERSION"),
        },
    ))
}

pub async fn status_handler(state: &State<ApiState>) -> ApiResult<SystemStatus> {
    let status = state
        .orchestrator
        .status()
        .await
        .map_err(|e| internal_error(&e))?;
    Ok(Json(DataResponse::success("System status", status)))
}

pub async fn list_jobs_handler(
    state: &State<ApiState>,
    company: Option<String>,
    location: Option<String>,
    skill: Option<String>,
    limit: Option<i64>,
) -> ApiResult<Vec<StoredJob>> {
    let query = JobQuery {
        company,
        location,
        skill,
        limit: Some(clamp_limit(limit)),
    };
    let jobs = JobRepository::new(state.orchestrator.database().pool())
        .list(&query)
        .await
        .map_err(|e| internal_error(&e))?;

    info!("Listing {} jobs", jobs.len());
    Ok(Json(DataResponse::list("Jobs", jobs)))
}

pub async fn list_posts_handler(
    state: &State<ApiState>,
    platform: Option<&str>,
    status: Option<&str>,
    limit: Option<i64>,
) -> ApiResult<Vec<PostRecord>> {
    let query = PostQuery {
        platform: parse_optional::<Platform>(platform, "Use platform=linkedin or platform=x")?,
        status: parse_optional::<PostStatus>(status, "Use status=pending, posted or failed")?,
        limit: Some(clamp_limit(limit)),
    };
    let posts = PostRepository::new(state.orchestrator.database().pool())
        .list(&query)
        .await
        .map_err(|e| internal_error(&e))?;

    Ok(Json(DataResponse::list("Posts", posts)))
}

pub async fn list_analytics_handler(
    state: &State<ApiState>,
    platform: Option<&str>,
    limit: Option<i64>,
) -> ApiResult<Vec<AnalyticsRecord>> {
    let platform = parse_optional::<Platform>(platform, "Use platform=linkedin or platform=x")?;
    let records = AnalyticsRepository::new(state.orchestrator.database().pool())
        .list(platform, Some(clamp_limit(limit)))
        .await
        .map_err(|e| internal_error(&e))?;

    Ok(Json(DataResponse::list("Analytics", records)))
}
