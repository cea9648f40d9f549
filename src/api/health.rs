//! Health endpoint
//!
//! - GET /health - Database reachability plus request statistics

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;

/// App version reported by `/health`
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Response for GET /health
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database can't be reached
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// Uptime formatted (e.g., "2h 15m")
    pub uptime_formatted: String,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// The endpoint always answers 200 so load balancers can read the body.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = match state.pool.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check: database ping failed: {:#}", e);
            false
        }
    };

    let stats = &state.request_stats;
    let uptime_seconds = stats.uptime_seconds();
    Json(HealthResponse {
        status: if database_ok { "ok" } else { "degraded" },
        database: if database_ok { "ok" } else { "unavailable" },
        version: APP_VERSION,
        uptime_seconds,
        uptime_formatted: format_uptime(uptime_seconds),
        total_requests: stats.total_requests(),
        avg_response_time_ms: stats.avg_response_time_ms(),
    })
}

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(125), "2m");
        assert_eq!(format_uptime(3 * 3600 + 60), "3h 1m");
        assert_eq!(format_uptime(86400 + 7200), "1d 2h 0m");
    }
}
