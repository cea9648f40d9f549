//! Router-level tests
//!
//! Each test builds the full application over an in-memory database and a
//! temporary upload directory, then drives it with `oneshot`.

use super::*;
use crate::config::UploadConfig;
use crate::db::{create_test_pool, migrations};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    uploads: tempfile::TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let uploads = tempfile::tempdir().unwrap();
        let state = AppState::new(
            pool,
            UploadConfig {
                path: uploads.path().to_path_buf(),
                ..UploadConfig::default()
            },
        );

        Self {
            router: build_router(state, "*"),
            uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn empty(&self, method: &str, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn create(&self, uri: &str, body: Value) -> Value {
        let (status, body) = self.json("POST", uri, body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body
    }
}

fn multipart_request(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "paranews-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::post("/api/uploads")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

// ============================================================================
// Tags
// ============================================================================

#[tokio::test]
async fn test_tag_crud_flow() {
    let app = TestApp::new().await;

    let tag = app
        .create("/api/tags", json!({ "name": "  Wheelchair Tennis " }))
        .await;
    assert_eq!(tag["name"], "Wheelchair Tennis");
    assert_eq!(tag["isActive"], true);
    let id = tag["id"].as_i64().unwrap();

    let (status, fetched) = app.get(&format!("/api/tags/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["articleCount"], 0);

    let (status, updated) = app
        .json("PUT", &format!("/api/tags/{}", id), json!({ "isActive": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Wheelchair Tennis");
    assert_eq!(updated["isActive"], false);

    let (status, toggled) = app.empty("PATCH", &format!("/api/tags/{}/toggle", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["isActive"], true);

    let (status, body) = app.empty("DELETE", &format!("/api/tags/{}", id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = app.get(&format!("/api/tags/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Tag not found" }));
}

#[tokio::test]
async fn test_tag_validation_errors() {
    let app = TestApp::new().await;
    let required = json!({ "error": "Tag name is required and must be a non-empty string" });

    for body in [json!({}), json!({ "name": "   " }), json!({ "name": 42 })] {
        let (status, error) = app.json("POST", "/api/tags", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, required);
    }

    let (status, error) = app
        .json("POST", "/api/tags", json!({ "name": "x".repeat(51) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Tag name must be at most 50 characters");

    app.create("/api/tags", json!({ "name": "Goalball" })).await;
    let (status, error) = app
        .json("POST", "/api/tags", json!({ "name": "Goalball" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "Tag with this name already exists");

    let (status, error) = app.get("/api/tags/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Invalid tag ID");

    let (status, error) = app
        .send(
            Request::post("/api/tags")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid JSON body: "));
}

#[tokio::test]
async fn test_mistyped_and_untyped_bodies_are_bad_requests() {
    let app = TestApp::new().await;

    let cases = [
        ("/api/tags", json!({ "name": "Boccia", "isActive": "yes" })),
        ("/api/news-classifications", json!({ "name": "Top", "priority": "high" })),
        ("/api/categories", json!("just a string")),
    ];
    for (uri, body) in cases {
        let (status, error) = app.json("POST", uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(error["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON body: "));
    }

    let (status, error) = app
        .send(
            Request::post("/api/tags")
                .body(Body::from(r#"{"name":"Boccia"}"#))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid JSON body: "));

    let (_, tags) = app.get("/api/tags").await;
    assert_eq!(tags, json!([]));
}

#[tokio::test]
async fn test_tag_list_filters_and_stats() {
    let app = TestApp::new().await;
    app.create("/api/tags", json!({ "name": "Para Cycling" })).await;
    app.create("/api/tags", json!({ "name": "Para Archery", "isActive": false }))
        .await;
    app.create("/api/tags", json!({ "name": "Boccia" })).await;

    let (_, all) = app.get("/api/tags?isActive=maybe").await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, active_para) = app.get("/api/tags?search=PARA&isActive=true").await;
    let names: Vec<&str> = active_para
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Para Cycling"]);

    let (_, sorted) = app.get("/api/tags?sortBy=name&sortOrder=asc").await;
    assert_eq!(sorted[0]["name"], "Boccia");

    let (status, stats) = app.get("/api/tags/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats, json!({ "total": 3, "active": 2, "inactive": 1 }));
}

// ============================================================================
// Categories and classifications
// ============================================================================

#[tokio::test]
async fn test_category_delete_blocked_by_news() {
    let app = TestApp::new().await;
    let category = app
        .create("/api/categories", json!({ "name": "Results", "description": "Scores" }))
        .await;
    let category_id = category["id"].as_i64().unwrap();
    assert_eq!(category["description"], "Scores");

    app.create(
        "/api/news",
        json!({ "title": "Day one", "content": "Medals", "categoryId": category_id }),
    )
    .await;

    let (status, error) = app
        .empty("DELETE", &format!("/api/categories/{}", category_id))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error["error"],
        "Cannot delete category with 1 associated articles"
    );

    let (status, kept) = app.get(&format!("/api/categories/{}", category_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kept["articleCount"], 1);

    let (_, cleared) = app
        .json(
            "PUT",
            &format!("/api/categories/{}", category_id),
            json!({ "description": null }),
        )
        .await;
    assert_eq!(cleared["description"], Value::Null);
}

#[tokio::test]
async fn test_classification_priority_and_reorder() {
    let app = TestApp::new().await;
    let first = app
        .create("/api/news-classifications", json!({ "name": "Featured" }))
        .await;
    let second = app
        .create(
            "/api/news-classifications",
            json!({ "name": "Breaking", "priority": 0 }),
        )
        .await;
    assert_eq!(first["priority"], 1);
    assert_eq!(second["priority"], 2);

    let (status, reordered) = app
        .json(
            "POST",
            "/api/news-classifications/reorder",
            json!({ "orderedIds": [second["id"], first["id"]] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reordered[0]["name"], "Breaking");
    assert_eq!(reordered[0]["priority"], 1);
    assert_eq!(reordered[1]["priority"], 2);

    let (status, error) = app
        .json(
            "POST",
            "/api/news-classifications/reorder",
            json!({ "orderedIds": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error["error"],
        "orderedIds must be a non-empty array of integers"
    );

    let (status, error) = app
        .json(
            "POST",
            "/api/news-classifications/reorder",
            json!({ "orderedIds": [first["id"], "x", second["id"]] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error["error"],
        "orderedIds must be a non-empty array of integers"
    );

    let (_, listed) = app.get("/api/news-classifications").await;
    let order: Vec<(&str, i64)> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| (c["name"].as_str().unwrap(), c["priority"].as_i64().unwrap()))
        .collect();
    assert_eq!(order, vec![("Breaking", 1), ("Featured", 2)]);
}

// ============================================================================
// News
// ============================================================================

#[tokio::test]
async fn test_news_lifecycle() {
    let app = TestApp::new().await;
    let category = app.create("/api/categories", json!({ "name": "Events" })).await;
    let tag = app.create("/api/tags", json!({ "name": "Athletics" })).await;

    let (status, error) = app
        .json(
            "POST",
            "/api/news",
            json!({ "title": "Orphan", "content": "Body", "categoryId": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Category not found");

    let news = app
        .create(
            "/api/news",
            json!({
                "title": "Record Broken in Paris",
                "content": "A new world record.",
                "categoryId": category["id"],
                "status": "published",
                "tagIds": [tag["id"]]
            }),
        )
        .await;
    let id = news["id"].as_i64().unwrap();
    assert_eq!(news["slug"], "record-broken-in-paris");
    assert_eq!(news["category"]["name"], "Events");
    assert_eq!(news["tags"][0]["name"], "Athletics");
    assert!(news["publishedAt"].is_string());

    let (status, error) = app
        .json(
            "POST",
            "/api/news",
            json!({
                "title": "Record Broken in Paris",
                "content": "Copy",
                "categoryId": category["id"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        error["error"],
        "News article with slug 'record-broken-in-paris' already exists"
    );

    let (status, viewed) = app.empty("POST", &format!("/api/news/{}/view", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(viewed["viewCount"], 1);

    let (status, by_slug) = app.get("/api/news/slug/record-broken-in-paris").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_slug["id"], id);

    let (_, page) = app.get("/api/news?status=published&perPage=5").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["perPage"], 5);

    let (status, updated) = app
        .json(
            "PUT",
            &format!("/api/news/{}", id),
            json!({ "title": "Record Broken Again", "tagIds": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Record Broken Again");
    assert_eq!(updated["tags"], json!([]));

    let (status, _) = app.empty("DELETE", &format!("/api/news/{}", id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, error) = app.get(&format!("/api/news/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "News article not found");
}

// ============================================================================
// Uploads and health
// ============================================================================

#[tokio::test]
async fn test_upload_image_and_serve_it() {
    let app = TestApp::new().await;

    let (status, stored) = app
        .send(multipart_request("featuredImage", "podium.png", "image/png", b"\x89PNG data"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let path = stored["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("/uploads/podium-"));
    assert!(app
        .uploads
        .path()
        .join(stored["filename"].as_str().unwrap())
        .exists());

    let response = app
        .router
        .clone()
        .oneshot(Request::get(path.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = TestApp::new().await;

    let (status, error) = app
        .send(multipart_request("featuredImage", "notes.txt", "text/plain", b"hello"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Only image files are allowed");

    let (status, error) = app
        .send(multipart_request("other", "podium.png", "image/png", b"data"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "No file provided");

    let big = vec![0u8; 5 * 1024 * 1024 + 1];
    let (status, error) = app
        .send(multipart_request("featuredImage", "big.jpg", "image/jpeg", &big))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "File too large. Maximum size is 5MB");

    assert_eq!(std::fs::read_dir(app.uploads.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_health_reports_database_and_requests() {
    let app = TestApp::new().await;
    app.get("/api/tags").await;

    let (status, health) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["database"], "ok");
    assert!(health["totalRequests"].as_u64().unwrap() >= 1);
}
