//! Integration tests for the manual items API

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use edmap::server::create_app;

mod test_utils;
use test_utils::{setup_test_db, test_config, test_state};

async fn test_app() -> axum::Router {
    let db = setup_test_db().await.unwrap();
    create_app(test_state(test_config(), db))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn post_item(user_id: &Uuid, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/items")
        .header(header::AUTHORIZATION, "Bearer test-token")
        .header("X-User-Id", user_id.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_items(user_id: &Uuid, query: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/api/items{}", query))
        .header(header::AUTHORIZATION, "Bearer test-token")
        .header("X-User-Id", user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_create_item_returns_the_created_item() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        app,
        post_item(&user_id, &json!({"title": "Read chapter 4", "type": "reading"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Item created successfully");
    assert_eq!(body["item"]["title"], "Read chapter 4");
    assert_eq!(body["item"]["type"], "reading");
    assert_eq!(body["item"]["status"], "no_due_date");
    assert_eq!(body["item"]["external_source"], "manual");
    assert_eq!(body["item"]["metadata"]["created_manually"], true);
}

#[tokio::test]
async fn test_create_item_requires_title_and_type() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        app.clone(),
        post_item(&user_id, &json!({"title": "  ", "type": "assignment"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title and type are required");

    let (status, body) = send(app, post_item(&user_id, &json!({"title": "Homework 1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title and type are required");
}

#[tokio::test]
async fn test_create_item_derives_status_from_due_date() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();

    let past = (Utc::now() - Duration::days(2)).to_rfc3339();
    let (status, body) = send(
        app.clone(),
        post_item(
            &user_id,
            &json!({"title": "Old homework", "type": "assignment", "dueAt": past}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["status"], "overdue");

    let future = (Utc::now() + Duration::days(2)).to_rfc3339();
    let (status, body) = send(
        app,
        post_item(
            &user_id,
            &json!({"title": "Next quiz", "type": "quiz", "dueAt": future}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["status"], "pending");
}

#[tokio::test]
async fn test_create_item_rejects_unparseable_due_date() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();

    let (status, body) = send(
        app,
        post_item(
            &user_id,
            &json!({"title": "Homework", "type": "assignment", "dueAt": "tomorrow"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "dueAt must be an RFC 3339 timestamp");
}

#[tokio::test]
async fn test_create_item_keeps_course_reference_in_metadata() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();
    let course_id = Uuid::new_v4();

    let (status, body) = send(
        app,
        post_item(
            &user_id,
            &json!({"title": "Essay", "type": "assignment", "courseId": course_id}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // The reference lives in metadata; the row is not linked to a course
    assert_eq!(
        body["item"]["metadata"]["course_id"],
        course_id.to_string()
    );
    assert_eq!(body["item"]["course_id"], Value::Null);
}

#[tokio::test]
async fn test_list_items_returns_owned_items_only() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();
    let other_user = Uuid::new_v4();

    send(
        app.clone(),
        post_item(&user_id, &json!({"title": "Mine", "type": "event"})),
    )
    .await;
    send(
        app.clone(),
        post_item(&other_user, &json!({"title": "Theirs", "type": "event"})),
    )
    .await;

    let (status, body) = send(app, get_items(&user_id, "")).await;

    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Mine");
}

#[tokio::test]
async fn test_list_items_filters_by_type_and_status() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();

    let past = (Utc::now() - Duration::days(1)).to_rfc3339();
    send(
        app.clone(),
        post_item(
            &user_id,
            &json!({"title": "Late homework", "type": "assignment", "dueAt": past}),
        ),
    )
    .await;
    send(
        app.clone(),
        post_item(&user_id, &json!({"title": "Quiz 1", "type": "quiz"})),
    )
    .await;

    let (status, body) = send(app.clone(), get_items(&user_id, "?type=quiz")).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Quiz 1");

    let (status, body) = send(app, get_items(&user_id, "?status=overdue")).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Late homework");
}

#[tokio::test]
async fn test_list_items_rejects_malformed_course_filter() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();

    let (status, body) = send(app, get_items(&user_id, "?courseId=not-a-uuid")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "courseId must be a valid UUID");
}
