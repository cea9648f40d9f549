//! Common API utilities and shared types
//!
//! Extractors and request parsing used by several entity routers.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::api::middleware::ApiError;
use crate::models::{EntityFilters, SortField, SortOrder};
use crate::services::EntityKind;

// ============================================================================
// Extractors
// ============================================================================

/// `Json<T>` whose rejection uses the `{ "error": ... }` shape
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// Syntax errors, type mismatches and a missing content type all answer 400
fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
}

/// Deserialize a field that distinguishes "absent" from `null`.
///
/// Use together with `#[serde(default)]`: absent gives `None`, `null` gives
/// `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Path and body parsing
// ============================================================================

/// Parse a numeric `:id` path segment
pub fn parse_id(raw: &str, kind: EntityKind) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("Invalid {} ID", kind.noun())))
}

fn name_error(kind: EntityKind) -> ApiError {
    ApiError::bad_request(format!(
        "{} name is required and must be a non-empty string",
        kind.label()
    ))
}

/// `name` on create: present, a string, not blank
pub fn required_name(value: Option<&Value>, kind: EntityKind) -> Result<String, ApiError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(name_error(kind)),
    }
}

/// `name` on update: absent is fine, otherwise same rules as create
pub fn optional_name(value: Option<&Value>, kind: EntityKind) -> Result<Option<String>, ApiError> {
    match value {
        None => Ok(None),
        some => required_name(some, kind).map(Some),
    }
}

// ============================================================================
// Query Types
// ============================================================================

/// Query string of the taxonomy list endpoints.
///
/// Every field is a raw string so a bad value never rejects the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListQuery {
    pub search: Option<String>,
    pub is_active: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl EntityListQuery {
    /// `"true"`/`"false"` filter on activity; anything else is ignored, as
    /// are unknown sort fields and directions.
    pub fn into_filters(self) -> EntityFilters {
        EntityFilters {
            search: self.search.filter(|s| !s.trim().is_empty()),
            is_active: match self.is_active.as_deref() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
            sort_by: self.sort_by.as_deref().and_then(SortField::parse),
            sort_order: self.sort_order.as_deref().and_then(SortOrder::parse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", EntityKind::Tag).unwrap(), 42);

        let err = parse_id("abc", EntityKind::Category).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid category ID");
    }

    #[test]
    fn test_required_name() {
        let body = json!({ "name": "Athletics", "blank": "  ", "number": 5 });

        assert_eq!(
            required_name(body.get("name"), EntityKind::Tag).unwrap(),
            "Athletics"
        );
        for field in ["blank", "number", "missing"] {
            let err = required_name(body.get(field), EntityKind::Tag).unwrap_err();
            assert_eq!(err.message, "Tag name is required and must be a non-empty string");
        }
        assert_eq!(optional_name(None, EntityKind::Tag).unwrap(), None);
        assert!(optional_name(Some(&Value::Null), EntityKind::Tag).is_err());
    }

    #[test]
    fn test_list_query_into_filters() {
        let filters = EntityListQuery {
            search: Some("para".to_string()),
            is_active: Some("yes".to_string()),
            sort_by: Some("name".to_string()),
            sort_order: Some("sideways".to_string()),
        }
        .into_filters();

        assert_eq!(filters.search.as_deref(), Some("para"));
        assert_eq!(filters.is_active, None);
        assert_eq!(filters.sort_by, Some(SortField::Name));
        assert_eq!(filters.sort_order, None);

        let inactive = EntityListQuery {
            is_active: Some("false".to_string()),
            ..Default::default()
        }
        .into_filters();
        assert_eq!(inactive.is_active, Some(false));
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_value(json!({})).unwrap();
        let null: Patch = serde_json::from_value(json!({ "description": null })).unwrap();
        let set: Patch = serde_json::from_value(json!({ "description": "x" })).unwrap();

        assert_eq!(absent.description, None);
        assert_eq!(null.description, Some(None));
        assert_eq!(set.description, Some(Some("x".to_string())));
    }
}
