//! HTTP server implementation.
//!
//! Exposes the decode endpoint and a health check:
//!
//! - `POST /decode-logs`: `{"logs": [...]}` (1 to 100 logs) → `{"decodedLogs": [...]}`
//! - `GET /health`

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::resolver::Resolver;
use crate::types::ResolvedLog;
use crate::validation::validate_request;

const PARSE_REQUEST_ERROR: &str = "unable to parse or process the request body";
const VALIDATION_ERROR: &str = "validation error on the request body";

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    pub version: String,
    pub startup_time: i64,
    pub resolver: Resolver,
}

impl HttpState {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            startup_time: chrono::Utc::now().timestamp(),
            resolver,
        }
    }
}

/// Health check response.
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeLogsResponse {
    pub decoded_logs: Vec<ResolvedLog>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    fn into_response(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Health check endpoint.
async fn health_handler(State(state): State<Arc<HttpState>>) -> Json<HealthResponse> {
    let now = chrono::Utc::now().timestamp();
    let uptime = now - state.startup_time;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: uptime,
    })
}

/// Decode endpoint.
///
/// The body is read raw so that unparseable JSON (400) and well-formed JSON
/// of the wrong shape (422) can be told apart.
async fn decode_logs_handler(State(state): State<Arc<HttpState>>, body: Bytes) -> Response {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(target: "log_decoder::http", "Request body parsing error: {}", e);
            return ErrorResponse {
                message: PARSE_REQUEST_ERROR.to_string(),
                error: None,
            }
            .into_response(StatusCode::BAD_REQUEST);
        }
    };

    let request = match validate_request(body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(target: "log_decoder::http", "Invalid request body: {}", e);
            return ErrorResponse {
                message: VALIDATION_ERROR.to_string(),
                error: Some(e.to_string()),
            }
            .into_response(StatusCode::UNPROCESSABLE_ENTITY);
        }
    };

    match state.resolver.resolve_batch(&request.logs).await {
        Ok(decoded_logs) => {
            let resolved = decoded_logs.iter().filter(|log| log.is_resolved()).count();
            tracing::info!(
                target: "log_decoder::http",
                "Resolved {}/{} log(s)",
                resolved,
                decoded_logs.len()
            );
            (StatusCode::OK, Json(DecodeLogsResponse { decoded_logs })).into_response()
        }
        Err(e) => {
            tracing::error!(target: "log_decoder::http", "Failed to decode all logs: {}", e);
            ErrorResponse {
                message: format!("an error occurred while decoding logs: {e}"),
                error: None,
            }
            .into_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Create the HTTP router with the decode and health endpoints.
pub fn create_http_router(resolver: Resolver) -> Router {
    let state = Arc::new(HttpState::new(resolver));

    Router::new()
        .route("/health", get(health_handler))
        .route("/decode-logs", post(decode_logs_handler))
        .with_state(state)
}
