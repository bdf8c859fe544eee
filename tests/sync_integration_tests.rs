//! Integration tests for the provider sync pipeline against mocked
//! Canvas and PrairieLearn APIs

use std::sync::Arc;

use chrono::{Duration, Utc};
use edmap::config::AppConfig;
use edmap::models::sync_run;
use edmap::providers::Registry;
use edmap::repositories::{
    CourseRepository, IntegrationRepository, IntegrationSecretRepository, ItemFilter,
    ItemRepository,
};
use edmap::sync::{SyncError, run_provider_sync};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

mod test_utils;
use test_utils::{create_test_profile, setup_test_db_arc, test_crypto_key};

/// Stores an integration with an access token and instance URL, the way the
/// connect endpoints do.
async fn seed_integration(
    db: &Arc<DatabaseConnection>,
    user_id: &Uuid,
    provider: &str,
    base_url: &str,
) -> Uuid {
    create_test_profile(db, Some(*user_id)).await.unwrap();

    let integration = IntegrationRepository::new(db.clone())
        .upsert(user_id, provider, None, None)
        .await
        .unwrap();

    let secrets = IntegrationSecretRepository::new(db.clone(), test_crypto_key());
    secrets
        .upsert_secret(&integration.id, "access_token", "sync-test-token", None)
        .await
        .unwrap();
    secrets
        .upsert_secret(
            &integration.id,
            &format!("{}_url", provider),
            base_url,
            None,
        )
        .await
        .unwrap();

    integration.id
}

async fn mount_canvas_mocks(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .and(header("authorization", "Bearer sync-test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 101,
            "name": "Intro to Computer Science",
            "course_code": "CS 101",
            "enrollment_state": "active",
            "total_students": 120,
            "html_url": "https://canvas.example.edu/courses/101"
        }])))
        .mount(mock_server)
        .await;

    let past_due = (Utc::now() - Duration::days(1)).to_rfc3339();
    Mock::given(method("GET"))
        .and(path("/api/v1/courses/101/assignments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 555,
            "name": "Homework 1",
            "description": "<p>Chapter 1 exercises</p>",
            "due_at": past_due,
            "points_possible": 100.0,
            "submission_types": ["online_upload"],
            "published": true,
            "html_url": "https://canvas.example.edu/courses/101/assignments/555"
        }])))
        .mount(mock_server)
        .await;

    let future_due = (Utc::now() + Duration::days(3)).to_rfc3339();
    Mock::given(method("GET"))
        .and(path("/api/v1/courses/101/quizzes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 777,
            "title": "Quiz 1",
            "due_at": future_due,
            "points_possible": 20.0,
            "quiz_type": "assignment",
            "published": true,
            "html_url": "https://canvas.example.edu/courses/101/quizzes/777"
        }])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_canvas_sync_creates_courses_and_items() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    let mock_server = MockServer::start().await;
    mount_canvas_mocks(&mock_server).await;
    seed_integration(&db, &user_id, "canvas", &mock_server.uri()).await;

    let counters = run_provider_sync(&db, &test_crypto_key(), &user_id, "canvas")
        .await
        .unwrap();

    assert_eq!(counters.courses_created, 1);
    assert_eq!(counters.courses_updated, 0);
    assert_eq!(counters.items_created, 2);
    assert_eq!(counters.items_updated, 0);

    let courses = CourseRepository::new(db.clone())
        .find_by_owner(&user_id)
        .await
        .unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].title, "Intro to Computer Science");
    assert_eq!(courses[0].code.as_deref(), Some("CS 101"));
    assert_eq!(courses[0].external_id.as_deref(), Some("101"));

    let items = ItemRepository::new(db.clone())
        .list_by_owner(&user_id, &ItemFilter::default())
        .await
        .unwrap();
    assert_eq!(items.len(), 2);

    let homework = items.iter().find(|item| item.title == "Homework 1").unwrap();
    assert_eq!(homework.item_type, "assignment");
    assert_eq!(homework.status, "overdue");
    assert_eq!(homework.external_source.as_deref(), Some("canvas"));
    assert_eq!(homework.points_possible, Some(100.0));
    assert_eq!(homework.course_id, Some(courses[0].id));

    let quiz = items.iter().find(|item| item.title == "Quiz 1").unwrap();
    assert_eq!(quiz.item_type, "quiz");
    assert_eq!(quiz.status, "pending");
}

#[tokio::test]
async fn test_second_sync_updates_rows_in_place() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    let mock_server = MockServer::start().await;
    mount_canvas_mocks(&mock_server).await;
    seed_integration(&db, &user_id, "canvas", &mock_server.uri()).await;

    run_provider_sync(&db, &test_crypto_key(), &user_id, "canvas")
        .await
        .unwrap();
    let second = run_provider_sync(&db, &test_crypto_key(), &user_id, "canvas")
        .await
        .unwrap();

    assert_eq!(second.courses_created, 0);
    assert_eq!(second.courses_updated, 1);
    assert_eq!(second.items_created, 0);
    assert_eq!(second.items_updated, 2);

    let items = ItemRepository::new(db.clone())
        .list_by_owner(&user_id, &ItemFilter::default())
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_sync_records_a_completed_run() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    let mock_server = MockServer::start().await;
    mount_canvas_mocks(&mock_server).await;
    let integration_id = seed_integration(&db, &user_id, "canvas", &mock_server.uri()).await;

    run_provider_sync(&db, &test_crypto_key(), &user_id, "canvas")
        .await
        .unwrap();

    let runs = sync_run::Entity::find()
        .filter(sync_run::Column::IntegrationId.eq(integration_id))
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "completed");
    assert_eq!(runs[0].provider, "canvas");
    assert_eq!(runs[0].courses_created, 1);
    assert_eq!(runs[0].items_created, 2);
    assert!(runs[0].completed_at.is_some());
    assert!(runs[0].error_message.is_none());
}

#[tokio::test]
async fn test_course_list_failure_marks_the_run_failed() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&mock_server)
        .await;
    let integration_id = seed_integration(&db, &user_id, "canvas", &mock_server.uri()).await;

    let err = run_provider_sync(&db, &test_crypto_key(), &user_id, "canvas")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ProviderFailed { .. }));

    let runs = sync_run::Entity::find()
        .filter(sync_run::Column::IntegrationId.eq(integration_id))
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "failed");
    assert!(runs[0].error_message.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_item_fetch_failure_skips_that_course() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    // Courses resolve but assignment and quiz fetches fall through to the
    // mock server's 404, so the run completes with the course alone
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 101,
            "name": "Intro to Computer Science",
            "course_code": "CS 101"
        }])))
        .mount(&mock_server)
        .await;
    seed_integration(&db, &user_id, "canvas", &mock_server.uri()).await;

    let counters = run_provider_sync(&db, &test_crypto_key(), &user_id, "canvas")
        .await
        .unwrap();

    assert_eq!(counters.courses_created, 1);
    assert_eq!(counters.items_created, 0);
}

#[tokio::test]
async fn test_sync_without_integration_is_not_found() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    let err = run_provider_sync(&db, &test_crypto_key(), &user_id, "canvas")
        .await
        .unwrap_err();

    match err {
        SyncError::IntegrationNotFound(provider) => assert_eq!(provider, "Canvas"),
        other => panic!("expected IntegrationNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sync_without_stored_token_is_credentials_not_found() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    create_test_profile(&db, Some(user_id)).await.unwrap();
    IntegrationRepository::new(db.clone())
        .upsert(&user_id, "canvas", None, None)
        .await
        .unwrap();

    let err = run_provider_sync(&db, &test_crypto_key(), &user_id, "canvas")
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::CredentialsNotFound(_)));
}

#[tokio::test]
async fn test_unknown_provider_slug_is_rejected() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    let err = run_provider_sync(&db, &test_crypto_key(), &user_id, "blackboard")
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::UnknownProvider(_)));
}

#[tokio::test]
async fn test_prairielearn_sync_maps_assessments() {
    Registry::initialize(&AppConfig::default());
    let db = setup_test_db_arc().await.unwrap();
    let user_id = Uuid::new_v4();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/courses"))
        .and(header("Private-Token", "sync-test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 42,
            "title": "Data Structures",
            "short_name": "CS 225",
            "institution": "Example University"
        }])))
        .mount(&mock_server)
        .await;

    let future_due = (Utc::now() + Duration::days(7)).to_rfc3339();
    Mock::given(method("GET"))
        .and(path("/api/v1/courses/42/assessments"))
        .and(header("Private-Token", "sync-test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9001,
            "title": "Machine Problem 1",
            "type": "Homework",
            "due_date": future_due,
            "points": 100.0,
            "course_id": 42
        }])))
        .mount(&mock_server)
        .await;

    seed_integration(&db, &user_id, "prairielearn", &mock_server.uri()).await;

    let counters = run_provider_sync(&db, &test_crypto_key(), &user_id, "prairielearn")
        .await
        .unwrap();

    assert_eq!(counters.courses_created, 1);
    assert_eq!(counters.items_created, 1);

    let items = ItemRepository::new(db.clone())
        .list_by_owner(&user_id, &ItemFilter::default())
        .await
        .unwrap();
    assert_eq!(items[0].title, "Machine Problem 1");
    assert_eq!(items[0].item_type, "Homework");
    assert_eq!(items[0].status, "pending");
    assert_eq!(items[0].external_source.as_deref(), Some("prairielearn"));
}
