//! Category API endpoints
//!
//! Same surface as tags under `/api/categories`. Categories additionally take
//! a `description`, which an update can clear by sending `null`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::common::{
    double_option, optional_name, parse_id, required_name, EntityListQuery, JsonBody,
};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    Category, CategoryWithCount, CreateCategoryInput, EntityStats, UpdateCategoryInput,
};
use crate::services::{EntityKind, ServiceError};

const KIND: EntityKind = EntityKind::Category;

/// Request body for creating a category
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateCategoryRequest {
    pub name: Option<Value>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for updating a category
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateCategoryRequest {
    pub name: Option<Value>,
    #[serde(deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Build the categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/stats", get(get_stats))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/{id}/toggle", patch(toggle_category))
}

async fn create_category(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let input = CreateCategoryInput {
        name: required_name(body.name.as_ref(), KIND)?,
        description: body.description,
        is_active: body.is_active,
    };
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<EntityListQuery>,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    Ok(Json(
        state
            .category_service
            .find_all(&query.into_filters())
            .await?,
    ))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<EntityStats>, ApiError> {
    Ok(Json(state.category_service.get_stats().await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CategoryWithCount>, ApiError> {
    let id = parse_id(&id, KIND)?;
    state
        .category_service
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let id = parse_id(&id, KIND)?;
    let input = UpdateCategoryInput {
        name: optional_name(body.name.as_ref(), KIND)?,
        description: body.description,
        is_active: body.is_active,
    };
    state
        .category_service
        .update(id, input)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn toggle_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Category>, ApiError> {
    let id = parse_id(&id, KIND)?;
    Ok(Json(state.category_service.toggle_active(id).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, KIND)?;
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
