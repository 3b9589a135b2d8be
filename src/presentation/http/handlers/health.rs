//! Health Check Handlers
//!
//! - `GET /health`: process is up, with version
//! - `GET /health/live`: liveness probe, never touches dependencies
//! - `GET /health/ready`: readiness probe with database, message bus and
//!   gateway status; 503 only when the database is unreachable
//!
//! A disconnected message bus degrades readiness without failing it: messages
//! are still stored and delivered to receivers connected to this node.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

use crate::infrastructure::database;
use crate::startup::AppState;

/// Database round-trips slower than this report `degraded`
const DATABASE_SLOW_THRESHOLD: Duration = Duration::from_millis(100);

static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Pin the uptime origin to server startup
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// Readiness report
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: ServiceHealth,
    pub message_bus: ServiceHealth,
    pub websocket: GatewayHealth,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceHealth {
    fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: None,
            message: None,
        }
    }

    fn with_status(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GatewayHealth {
    pub active_connections: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let database = check_database(&state).await;
    let message_bus = check_message_bus(state.bridge.is_connected());
    let status = overall_status(&database, &message_bus);

    let response = ReadinessResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        started_at: SERVER_START_TIME.to_rfc3339(),
        checks: ReadinessChecks {
            database,
            message_bus,
            websocket: GatewayHealth {
                active_connections: state.gateway.connection_count(),
            },
        },
    };

    let code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(response))
}

async fn check_database(state: &AppState) -> ServiceHealth {
    match database::ping(&state.db).await {
        Ok(latency) => ServiceHealth {
            status: if latency < DATABASE_SLOW_THRESHOLD {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            latency_ms: Some(latency.as_millis() as u64),
            message: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Readiness database check failed");
            ServiceHealth::with_status(
                HealthStatus::Unhealthy,
                format!("Database connection failed: {}", e),
            )
        }
    }
}

fn check_message_bus(connected: bool) -> ServiceHealth {
    if connected {
        ServiceHealth::healthy()
    } else {
        ServiceHealth::with_status(
            HealthStatus::Degraded,
            "Message broker disconnected, delivering to local connections only",
        )
    }
}

/// The database decides availability; the bus can only degrade it.
fn overall_status(database: &ServiceHealth, bus: &ServiceHealth) -> HealthStatus {
    let bus = bus.status.min(HealthStatus::Degraded);
    database.status.max(bus)
}
