//! Upload API endpoints
//!
//! - POST /api/uploads - Store one image sent as multipart field `featuredImage`
//!
//! Files are validated and written by [`ImageStore`](crate::services::ImageStore);
//! the response carries the public path to put into a news article.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::{StoredImage, UploadError};

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "featuredImage";

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Build the upload router.
///
/// The body limit sits slightly above `max_file_size` so oversize files are
/// rejected with the upload error message rather than a bare 413.
pub fn router(max_file_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_file_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/", post(upload_image))
        .layer(DefaultBodyLimit::max(limit))
}

async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredImage>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, &state))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("image").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        // Reject by name and type before reading the body
        state.image_store.validate(&filename, &content_type, 0)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, &state))?;
        let stored = state
            .image_store
            .save(&filename, &content_type, &data)
            .await?;

        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(UploadError::MissingFile.into())
}

fn multipart_error(err: MultipartError, state: &AppState) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge {
            max_bytes: state.upload_config.max_file_size,
        }
        .into();
    }
    ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
}
