//! API middleware and shared handler state
//!
//! Contains:
//! - `AppState`, the services every handler can reach
//! - `ApiError`, the `{ "error": "..." }` response used by all endpoints
//! - Request statistics collection

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::UploadConfig;
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxClassificationRepository, SqlxNewsRepository, SqlxTagRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    CategoryService, ClassificationService, ImageStore, NewsService, ServiceError, TagService,
    UploadError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Sum of response times in microseconds
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in milliseconds
    pub fn avg_response_time_ms(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64 / 1000.0
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub tag_service: Arc<TagService>,
    pub category_service: Arc<CategoryService>,
    pub classification_service: Arc<ClassificationService>,
    pub news_service: Arc<NewsService>,
    pub image_store: Arc<ImageStore>,
    pub upload_config: Arc<UploadConfig>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DynDatabasePool, upload: UploadConfig) -> Self {
        let image_store = Arc::new(ImageStore::new(upload.clone()));

        Self {
            tag_service: Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone()))),
            category_service: Arc::new(CategoryService::new(SqlxCategoryRepository::boxed(
                pool.clone(),
            ))),
            classification_service: Arc::new(ClassificationService::new(
                SqlxClassificationRepository::boxed(pool.clone()),
            )),
            news_service: Arc::new(NewsService::new(
                SqlxNewsRepository::boxed(pool.clone()),
                image_store.clone(),
            )),
            image_store,
            upload_config: Arc::new(upload),
            request_stats: Arc::new(RequestStats::new()),
            pool,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors.
///
/// Serialised as `{ "error": "<message>" }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Generic 500; the cause is logged, never returned to the client
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: &self.message,
            }),
        )
            .into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Self::bad_request(msg),
            e @ ServiceError::HasArticles { .. } => Self::bad_request(e.to_string()),
            e @ (ServiceError::DuplicateName(_) | ServiceError::DuplicateSlug(_)) => {
                Self::conflict(e.to_string())
            }
            e @ ServiceError::NotFound(_) => Self::not_found(e.to_string()),
            ServiceError::Internal(e) => Self::internal(format!("{:#}", e)),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            e @ (UploadError::InvalidType
            | UploadError::TooLarge { .. }
            | UploadError::MissingFile) => Self::bad_request(e.to_string()),
            UploadError::Io(e) => Self::internal(e),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Request statistics middleware
///
/// Records request count and response time for the health endpoint.
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state
        .request_stats
        .record(start.elapsed().as_micros() as u64);
    response
}
