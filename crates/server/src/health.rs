//! Liveness and readiness probes.
//!
//! `/health` only proves the process is serving requests. `/ready` pushes a
//! trivial query through the connection pool, so it fails while the store is
//! unreachable or every connection is busy.

use std::time::SystemTime;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use store::PoolStatus;
use tracing::warn;

use crate::api::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: i64,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

/// Pool occupancy as reported by `/ready`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolDetails {
    pub size: usize,
    pub idle: usize,
    pub available: usize,
}

impl From<PoolStatus> for PoolDetails {
    fn from(status: PoolStatus) -> Self {
        Self {
            size: status.size,
            idle: status.idle,
            available: status.available,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub status: HealthStatus,
    pub timestamp: i64,
    pub pool: PoolDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for ReadinessResponse {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

pub async fn liveness_handler() -> HealthResponse {
    HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now(),
    }
}

pub async fn readiness_handler(State(state): State<AppState>) -> ReadinessResponse {
    let ping = state.pool.ping().await;
    let pool = PoolDetails::from(state.pool.status());

    match ping {
        Ok(()) => ReadinessResponse {
            ready: true,
            status: HealthStatus::Healthy,
            timestamp: now(),
            pool,
            error: None,
        },
        Err(err) => {
            warn!("Readiness check failed: {}", err);
            ReadinessResponse {
                ready: false,
                status: HealthStatus::Unhealthy,
                timestamp: now(),
                pool,
                error: Some(err.to_string()),
            }
        }
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
