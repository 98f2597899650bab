// src/web/mod.rs
//! Read-only JSON API over the store and the orchestrator status

pub mod handlers;
pub mod types;

pub use types::*;

use anyhow::{Context, Result};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, routes, Build, Request, Response, Rocket, State};
use std::sync::Arc;
use tracing::info;

use crate::core::config_manager::ServerSettings;
use crate::database::{AnalyticsRecord, PostRecord};
use crate::jobs::StoredJob;
use crate::orchestrator::{Orchestrator, SystemStatus};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[get("/health")]
pub async fn health(state: &State<ApiState>) -> Json<DataResponse<HealthData>> {
    handlers::health_handler(state).await
}

#[get("/status")]
pub async fn system_status(state: &State<ApiState>) -> ApiResult<SystemStatus> {
    handlers::status_handler(state).await
}

#[get("/jobs?<company>&<location>&<skill>&<limit>")]
pub async fn list_jobs(
    state: &State<ApiState>,
    company: Option<String>,
    location: Option<String>,
    skill: Option<String>,
    limit: Option<i64>,
) -> ApiResult<Vec<StoredJob>> {
    handlers::list_jobs_handler(state, company, location, skill, limit).await
}

#[get("/posts?<platform>&<status>&<limit>")]
pub async fn list_posts(
    state: &State<ApiState>,
    platform: Option<&str>,
    status: Option<&str>,
    limit: Option<i64>,
) -> ApiResult<Vec<PostRecord>> {
    handlers::list_posts_handler(state, platform, status, limit).await
}

#[get("/analytics?<platform>&<limit>")]
pub async fn list_analytics(
    state: &State<ApiState>,
    platform: Option<&str>,
    limit: Option<i64>,
) -> ApiResult<Vec<AnalyticsRecord>> {
    handlers::list_analytics_handler(state, platform, limit).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request",
        "BAD_REQUEST",
        vec!["Check the query parameters".to_string()],
    ))
}

#[rocket::catch(404)]
pub fn not_found(request: &Request<'_>) -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        format!("No route for {}", request.uri()),
        "NOT_FOUND",
        vec![
            "Available endpoints: /api/health, /api/status, /api/jobs, /api/posts, /api/analytics"
                .to_string(),
        ],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid query parameter",
        "INVALID_PARAMETER",
        vec!["limit must be an integer".to_string()],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error",
        "INTERNAL_ERROR",
        vec!["Try again in a few moments".to_string()],
    ))
}

pub fn build_rocket(orchestrator: Arc<Orchestrator>, rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(Cors)
        .manage(ApiState { orchestrator })
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                health,
                system_status,
                list_jobs,
                list_posts,
                list_analytics,
                options
            ],
        )
}

/// Serve the API until Rocket shuts down
pub async fn start_web_server(orchestrator: Arc<Orchestrator>, settings: &ServerSettings) -> Result<()> {
    let figment = rocket::Config::figment()
        .merge(("address", settings.address.clone()))
        .merge(("port", settings.port));

    info!(
        "Starting jobcast API server on {}:{}",
        settings.address, settings.port
    );
    build_rocket(orchestrator, rocket::custom(figment))
        .launch()
        .await
        .context("API server failed")?;
    Ok(())
}
