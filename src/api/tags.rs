//! Tag API endpoints
//!
//! - POST   /api/tags - Create tag
//! - GET    /api/tags - List tags with article counts
//! - GET    /api/tags/stats - Active/inactive counters
//! - GET    /api/tags/{id} - Get tag
//! - PUT    /api/tags/{id} - Partial update
//! - PATCH  /api/tags/{id}/toggle - Flip `isActive`
//! - DELETE /api/tags/{id} - Delete an unused tag

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::common::{optional_name, parse_id, required_name, EntityListQuery, JsonBody};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateTagInput, EntityStats, Tag, TagWithCount, UpdateTagInput};
use crate::services::{EntityKind, ServiceError};

const KIND: EntityKind = EntityKind::Tag;

/// Request body for creating a tag
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTagRequest {
    /// Kept raw so a non-string name gets the same message as a missing one
    pub name: Option<Value>,
    pub is_active: Option<bool>,
}

/// Request body for updating a tag
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTagRequest {
    pub name: Option<Value>,
    pub is_active: Option<bool>,
}

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/stats", get(get_stats))
        .route("/{id}", get(get_tag).put(update_tag).delete(delete_tag))
        .route("/{id}/toggle", patch(toggle_tag))
}

async fn create_tag(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let input = CreateTagInput {
        name: required_name(body.name.as_ref(), KIND)?,
        is_active: body.is_active,
    };
    let tag = state.tag_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<EntityListQuery>,
) -> Result<Json<Vec<TagWithCount>>, ApiError> {
    let tags = state.tag_service.find_all(&query.into_filters()).await?;
    Ok(Json(tags))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<EntityStats>, ApiError> {
    Ok(Json(state.tag_service.get_stats().await?))
}

async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TagWithCount>, ApiError> {
    let id = parse_id(&id, KIND)?;
    state
        .tag_service
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateTagRequest>,
) -> Result<Json<Tag>, ApiError> {
    let id = parse_id(&id, KIND)?;
    let input = UpdateTagInput {
        name: optional_name(body.name.as_ref(), KIND)?,
        is_active: body.is_active,
    };
    state
        .tag_service
        .update(id, input)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn toggle_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    let id = parse_id(&id, KIND)?;
    Ok(Json(state.tag_service.toggle_active(id).await?))
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, KIND)?;
    state.tag_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
