//! News API endpoints
//!
//! Handles HTTP requests for news articles:
//! - GET    /api/news - Paged listing with filters
//! - POST   /api/news - Create article
//! - GET    /api/news/{id} - Article with category, tags and classifications
//! - GET    /api/news/slug/{slug} - Same, by slug
//! - PUT    /api/news/{id} - Partial update
//! - POST   /api/news/{id}/view - Count a view
//! - DELETE /api/news/{id} - Delete article and its images

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{double_option, parse_id, JsonBody};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    CreateNewsInput, ListParams, News, NewsDetail, NewsFilters, NewsStatus, PagedResult,
    UpdateNewsInput,
};
use crate::services::{EntityKind, ServiceError};

const KIND: EntityKind = EntityKind::News;

/// Query parameters for listing news
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNewsQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub category_id: Option<String>,
    pub tag_id: Option<String>,
    pub classification_id: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ListNewsQuery {
    fn into_parts(self) -> Result<(NewsFilters, ListParams), ApiError> {
        let defaults = ListParams::default();
        let params = ListParams::new(
            parse_number(self.page.as_deref(), "page")?.unwrap_or(defaults.page),
            parse_number(self.per_page.as_deref(), "perPage")?.unwrap_or(defaults.per_page),
        );
        let filters = NewsFilters {
            search: self.search,
            status: self.status.as_deref().map(parse_status).transpose()?,
            category_id: parse_number(self.category_id.as_deref(), "categoryId")?,
            tag_id: parse_number(self.tag_id.as_deref(), "tagId")?,
            classification_id: parse_number(
                self.classification_id.as_deref(),
                "classificationId",
            )?,
        };
        Ok((filters, params))
    }
}

/// Request body for creating an article
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateNewsRequest {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub featured_image: Option<String>,
    pub other_images: Vec<String>,
    pub category_id: Option<i64>,
    pub status: Option<String>,
    pub read_time: Option<i32>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub tag_ids: Vec<i64>,
    pub classification_ids: Vec<i64>,
}

/// Request body for updating an article; `null` clears nullable fields
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateNewsRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub featured_image: Option<Option<String>>,
    pub other_images: Option<Vec<String>>,
    pub category_id: Option<i64>,
    pub status: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub read_time: Option<Option<i32>>,
    #[serde(deserialize_with = "double_option")]
    pub meta_description: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub meta_keywords: Option<Option<String>>,
    pub tag_ids: Option<Vec<i64>>,
    pub classification_ids: Option<Vec<i64>>,
}

impl TryFrom<CreateNewsRequest> for CreateNewsInput {
    type Error = ApiError;

    fn try_from(body: CreateNewsRequest) -> Result<Self, Self::Error> {
        let category_id = body
            .category_id
            .ok_or_else(|| ApiError::bad_request("categoryId is required"))?;

        Ok(Self {
            title: body.title,
            slug: body.slug,
            excerpt: body.excerpt,
            content: body.content,
            featured_image: body.featured_image,
            other_images: body.other_images,
            category_id,
            status: body.status.as_deref().map(parse_status).transpose()?,
            read_time: body.read_time,
            meta_description: body.meta_description,
            meta_keywords: body.meta_keywords,
            tag_ids: body.tag_ids,
            classification_ids: body.classification_ids,
        })
    }
}

impl TryFrom<UpdateNewsRequest> for UpdateNewsInput {
    type Error = ApiError;

    fn try_from(body: UpdateNewsRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: body.title,
            slug: body.slug,
            excerpt: body.excerpt,
            content: body.content,
            featured_image: body.featured_image,
            other_images: body.other_images,
            category_id: body.category_id,
            status: body.status.as_deref().map(parse_status).transpose()?,
            read_time: body.read_time,
            meta_description: body.meta_description,
            meta_keywords: body.meta_keywords,
            tag_ids: body.tag_ids,
            classification_ids: body.classification_ids,
        })
    }
}

fn parse_status(raw: &str) -> Result<NewsStatus, ApiError> {
    NewsStatus::parse(raw).ok_or_else(|| {
        ApiError::bad_request(format!(
            "Invalid status '{}'. Expected draft, published or archived",
            raw
        ))
    })
}

fn parse_number<T: std::str::FromStr>(raw: Option<&str>, field: &str) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {}", field))),
    }
}

/// Build the news router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_news).post(create_news))
        .route("/slug/{slug}", get(get_news_by_slug))
        .route("/{id}", get(get_news).put(update_news).delete(delete_news))
        .route("/{id}/view", post(record_view))
}

async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<ListNewsQuery>,
) -> Result<Json<PagedResult<News>>, ApiError> {
    let (filters, params) = query.into_parts()?;
    Ok(Json(state.news_service.list(&filters, &params).await?))
}

async fn create_news(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateNewsRequest>,
) -> Result<(StatusCode, Json<NewsDetail>), ApiError> {
    let detail = state.news_service.create(body.try_into()?).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn get_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NewsDetail>, ApiError> {
    let id = parse_id(&id, KIND)?;
    state
        .news_service
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn get_news_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<NewsDetail>, ApiError> {
    state
        .news_service
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn update_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateNewsRequest>,
) -> Result<Json<NewsDetail>, ApiError> {
    let id = parse_id(&id, KIND)?;
    state
        .news_service
        .update(id, body.try_into()?)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(KIND).into())
}

async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<News>, ApiError> {
    let id = parse_id(&id, KIND)?;
    Ok(Json(state.news_service.record_view(id).await?))
}

async fn delete_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, KIND)?;
    state.news_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_parsing() {
        let query = ListNewsQuery {
            status: Some("published".to_string()),
            category_id: Some("3".to_string()),
            page: Some("2".to_string()),
            per_page: Some("500".to_string()),
            ..Default::default()
        };
        let (filters, params) = query.into_parts().unwrap();

        assert_eq!(filters.status, Some(NewsStatus::Published));
        assert_eq!(filters.category_id, Some(3));
        assert_eq!(filters.tag_id, None);
        assert_eq!(params.page, 2);
        assert_eq!(params.per_page, 100);
    }

    #[test]
    fn test_list_query_rejects_bad_values() {
        let bad_id = ListNewsQuery {
            tag_id: Some("x".to_string()),
            ..Default::default()
        };
        assert_eq!(bad_id.into_parts().unwrap_err().message, "Invalid tagId");

        let bad_status = ListNewsQuery {
            status: Some("hidden".to_string()),
            ..Default::default()
        };
        assert!(bad_status.into_parts().is_err());
    }

    #[test]
    fn test_create_request_requires_category() {
        let body: CreateNewsRequest =
            serde_json::from_value(serde_json::json!({ "title": "T", "content": "B" })).unwrap();
        let err = CreateNewsInput::try_from(body).unwrap_err();
        assert_eq!(err.message, "categoryId is required");
    }

    #[test]
    fn test_update_request_distinguishes_null() {
        let body: UpdateNewsRequest = serde_json::from_value(serde_json::json!({
            "featuredImage": null,
            "status": "archived"
        }))
        .unwrap();
        let input = UpdateNewsInput::try_from(body).unwrap();

        assert_eq!(input.featured_image, Some(None));
        assert_eq!(input.excerpt, None);
        assert_eq!(input.status, Some(NewsStatus::Archived));
    }
}
