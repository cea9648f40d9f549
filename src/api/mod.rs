//! API layer - HTTP handlers and routing
//!
//! One router per resource, nested under `/api`:
//! - `/api/tags`
//! - `/api/categories`
//! - `/api/news-classifications`
//! - `/api/news`
//! - `/api/uploads`
//!
//! plus `/health` and read-only static serving of uploaded files.

pub mod categories;
pub mod classifications;
pub mod common;
pub mod health;
pub mod middleware;
pub mod news;
pub mod tags;
pub mod upload;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the `/api` router
pub fn build_api_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/tags", tags::router())
        .nest("/categories", categories::router())
        .nest("/news-classifications", classifications::router())
        .nest("/news", news::router())
        .nest("/uploads", upload::router(state.upload_config.max_file_size))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let uploads = ServeDir::new(&state.upload_config.path);
    let public_prefix = match state.upload_config.public_prefix.trim_end_matches('/') {
        "" => "/uploads".to_string(),
        prefix => prefix.to_string(),
    };

    Router::new()
        .nest("/api", build_api_router(&state))
        .merge(health::router())
        .nest_service(&public_prefix, uploads)
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

/// `*` allows any origin; anything else must be a single valid origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin.trim() == "*" {
        return cors.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            cors
        }
    }
}
