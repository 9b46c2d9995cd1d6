//! Health Check API
//!
//! Served behind the access gate like every other route, so it only answers
//! allow-listed, authenticated clients.

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::password::{local_date, PasswordOracle};

/// Application state shared across handlers
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Application version
    pub version: &'static str,
    oracle: PasswordOracle,
    allow_list_len: usize,
}

impl AppState {
    pub fn new(oracle: PasswordOracle, allow_list_len: usize) -> Self {
        Self {
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
            oracle,
            allow_list_len,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    /// `DAILY` or `STATIC`
    pub password_mode: &'static str,
    pub timezone: &'static str,
    /// Calendar date the current daily password belongs to (YYYY-MM-DD)
    pub rotation_date: String,
    pub allow_list_entries: usize,
    /// Timestamp (ISO 8601)
    pub timestamp: String,
}

/// Health check handler
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = Utc::now();
    let tz = state.oracle.timezone();

    Json(HealthResponse {
        status: "ok",
        version: state.version,
        uptime_secs: state.uptime_secs(),
        password_mode: state.oracle.mode().as_str(),
        timezone: tz.name(),
        rotation_date: local_date(now, tz).to_string(),
        allow_list_entries: state.allow_list_len,
        timestamp: now.to_rfc3339(),
    })
}

/// Liveness probe (minimal response)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Create health check router
pub fn health_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(liveness))
        .with_state(state)
}
