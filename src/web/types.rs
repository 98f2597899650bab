// src/web/types.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use std::sync::Arc;

use crate::orchestrator::Orchestrator;

/// Shared state handed to every route
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Data,
    Error,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message: message.into(),
            count: None,
            data,
        }
    }
}

impl<T> DataResponse<Vec<T>> {
    pub fn list(message: impl Into<String>, data: Vec<T>) -> Self {
        let mut response = Self::success(message, data);
        response.count = Some(response.data.len());
        response
    }
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

impl StandardErrorResponse {
    pub fn new(error: impl Into<String>, error_code: &str, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error: error.into(),
            error_code: error_code.to_string(),
            suggestions,
        }
    }
}

pub type ApiError = (Status, Json<StandardErrorResponse>);
pub type ApiResult<T> = Result<Json<DataResponse<T>>, ApiError>;

pub fn bad_request(error: impl Into<String>, suggestion: &str) -> ApiError {
    (
        Status::BadRequest,
        Json(StandardErrorResponse::new(
            error,
            "BAD_REQUEST",
            vec![suggestion.to_string()],
        )),
    )
}

pub fn internal_error(error: &anyhow::Error) -> ApiError {
    tracing::error!("Request failed: {:#}", error);
    (
        Status::InternalServerError,
        Json(StandardErrorResponse::new(
            "Internal server error",
            "INTERNAL_ERROR",
            vec!["Check the server logs".to_string()],
        )),
    )
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthData {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}
