//! News classification API endpoints
//!
//! Mounted at `/api/news-classifications` with the usual CRUD routes plus
//! `POST /reorder`, which rewrites priorities to follow `orderedIds`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::common::{optional_name, parse_id, required_name, EntityListQuery, JsonBody};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    ClassificationWithCount, CreateClassificationInput, EntityStats, NewsClassification,
    UpdateClassificationInput,
};
use crate::services::{EntityKind, ServiceError};

const KIND: EntityKind = EntityKind::Classification;

const ORDERED_IDS_ERROR: &str = "orderedIds must be a non-empty array of integers";

/// Request body for creating a classification
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateClassificationRequest {
    pub name: Option<Value>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

/// Request body for updating a classification
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateClassificationRequest {
    pub name: Option<Value>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

/// Build the classifications router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classifications).post(create_classification))
        .route("/stats", get(get_stats))
        .route("/reorder", post(reorder_classifications))
        .route(
            "/{id}",
            get(get_classification)
                .put(update_classification)
                .delete(delete_classification),
        )
        .route("/{id}/toggle", patch(toggle_classification))
}

async fn create_classification(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateClassificationRequest>,
) -> Result<(StatusCode, Json<NewsClassification>), ApiError> {
    let input = CreateClassificationInput {
        name: required_name(body.name.as_ref(), KIND)?,
        priority: body.priority,
        is_active: body.is_active,
    };
    let classification = state.classification_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(classification)))
}

async fn list_classifications(
    State(state): State<AppState>,
    Query(query): Query<EntityListQuery>,
) -> Result<Json<Vec<ClassificationWithCount>>, ApiError> {
    Ok(Json(
        state
            .classification_service
            .find_all(&query.into_filters())
            .await?,
    ))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<EntityStats>, ApiError> {
    Ok(Json(state.classification_service.get_stats().await?))
}

async fn get_classification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClassificationWithCount>, ApiError> {
    let id = parse_id(&id, KIND)?;
    state
        .classification_service
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn update_classification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateClassificationRequest>,
) -> Result<Json<NewsClassification>, ApiError> {
    let id = parse_id(&id, KIND)?;
    let input = UpdateClassificationInput {
        name: optional_name(body.name.as_ref(), KIND)?,
        priority: body.priority,
        is_active: body.is_active,
    };
    state
        .classification_service
        .update(id, input)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn toggle_classification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NewsClassification>, ApiError> {
    let id = parse_id(&id, KIND)?;
    Ok(Json(state.classification_service.toggle_active(id).await?))
}

async fn delete_classification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, KIND)?;
    state.classification_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/news-classifications/reorder
///
/// Body `{ "orderedIds": [3, 1, 2] }`; responds with every classification in
/// its new priority order.
async fn reorder_classifications(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Vec<ClassificationWithCount>>, ApiError> {
    let ordered_ids = parse_ordered_ids(&body)?;
    Ok(Json(
        state.classification_service.reorder(&ordered_ids).await?,
    ))
}

fn parse_ordered_ids(body: &Value) -> Result<Vec<i64>, ApiError> {
    let items = body
        .get("orderedIds")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| ApiError::bad_request(ORDERED_IDS_ERROR))?;

    items
        .iter()
        .map(|v| v.as_i64().ok_or_else(|| ApiError::bad_request(ORDERED_IDS_ERROR)))
        .collect()
}
