//! # Items API Handlers
//!
//! This module contains handlers for creating manually tracked items and
//! listing a user's items with optional equality filters.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{UserExtension, UserHeader};
use crate::error::ApiError;
use crate::models::item;
use crate::repositories::{ItemFilter, ItemRepository, ProfileRepository};
use crate::server::AppState;
use crate::sync::status_for_due_at;

/// Request body for creating a manual item
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    /// Item title
    pub title: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Item type (assignment, quiz, exam, project, reading, discussion, event)
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    /// Due date as an RFC 3339 timestamp
    pub due_at: Option<String>,
    /// Maximum points
    pub points: Option<f64>,
    /// Link to the item
    pub url: Option<String>,
    /// Course the item relates to, recorded in metadata
    #[schema(value_type = Option<String>)]
    pub course_id: Option<Uuid>,
}

/// Item row for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemInfo {
    /// Unique identifier for the item
    #[schema(value_type = String)]
    pub id: Uuid,
    /// Course the item belongs to, if any
    #[schema(value_type = Option<String>)]
    pub course_id: Option<Uuid>,
    /// Source the item was imported through, if any
    #[schema(value_type = Option<String>)]
    pub source_id: Option<Uuid>,
    /// Item title
    pub title: String,
    /// Free-form description
    pub description: Option<String>,
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,
    /// Status derived from the due date at write time
    pub status: String,
    /// Due date (RFC 3339)
    pub due_at: Option<String>,
    /// Maximum points, when known
    pub points_possible: Option<f64>,
    /// Where the row came from (canvas, prairielearn, ics, manual)
    pub external_source: Option<String>,
    /// Link back to the item on the provider
    pub external_url: Option<String>,
    /// Provider-specific fields without a column of their own
    pub metadata: Option<serde_json::Value>,
    /// Timestamp when the item was created (RFC 3339)
    pub created_at: String,
    /// Timestamp when the item was last updated (RFC 3339)
    pub updated_at: String,
}

impl From<item::Model> for ItemInfo {
    fn from(model: item::Model) -> Self {
        Self {
            id: model.id,
            course_id: model.course_id,
            source_id: model.source_id,
            title: model.title,
            description: model.description,
            item_type: model.item_type,
            status: model.status,
            due_at: model.due_at.map(|dt| dt.to_rfc3339()),
            points_possible: model.points_possible,
            external_source: model.external_source,
            external_url: model.external_url,
            metadata: model.metadata,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Response payload for item creation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateItemResponse {
    /// Whether the item was created
    pub success: bool,
    /// Human-readable confirmation
    pub message: String,
    /// The created item
    pub item: ItemInfo,
}

/// Response wrapper for item listings
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemsResponse {
    /// Items matching the query, newest first
    pub items: Vec<ItemInfo>,
}

/// Query parameters for item listings
#[derive(Debug, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ListItemsQuery {
    /// Filter by item type
    #[serde(rename = "type")]
    #[param(rename = "type")]
    pub item_type: Option<String>,
    /// Filter by status
    pub status: Option<String>,
    /// Filter by course (UUID)
    #[serde(rename = "courseId")]
    #[param(rename = "courseId")]
    pub course_id: Option<String>,
}

/// Creates a manually tracked item for the authenticated user
#[utoipa::path(
    post,
    path = "/api/items",
    security(("bearer_auth" = [])),
    params(UserHeader),
    request_body = CreateItemRequest,
    responses(
        (status = 200, description = "Item created", body = CreateItemResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    UserExtension(user): UserExtension,
    Json(request): Json<CreateItemRequest>,
) -> Result<Json<CreateItemResponse>, ApiError> {
    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty());
    let item_type = request
        .item_type
        .as_deref()
        .map(str::trim)
        .filter(|item_type| !item_type.is_empty());

    let (Some(title), Some(item_type)) = (title, item_type) else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Title and type are required",
        ));
    };

    let due_at = match request.due_at.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|_| {
                    ApiError::new(
                        StatusCode::BAD_REQUEST,
                        "VALIDATION_FAILED",
                        "dueAt must be an RFC 3339 timestamp",
                    )
                })?
                .with_timezone(&Utc),
        ),
        None => None,
    };
    let status = status_for_due_at(due_at, Utc::now());

    let db = Arc::new(state.db.clone());
    ProfileRepository::new(db.clone())
        .ensure_exists(&user.0)
        .await?;

    let items = ItemRepository::new(db);
    let model = items
        .create(item::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(user.0),
            title: Set(title.to_string()),
            description: Set(Some(request.description.clone().unwrap_or_default())),
            item_type: Set(item_type.to_string()),
            status: Set(status.to_string()),
            due_at: Set(due_at.map(Into::into)),
            points_possible: Set(request.points),
            external_source: Set(Some("manual".to_string())),
            external_url: Set(request.url.clone()),
            metadata: Set(Some(serde_json::json!({
                "created_manually": true,
                "course_id": request.course_id,
            }))),
            ..Default::default()
        })
        .await?;

    tracing::info!(item_id = %model.id, user_id = %user.0, "Manual item created");

    Ok(Json(CreateItemResponse {
        success: true,
        message: "Item created successfully".to_string(),
        item: ItemInfo::from(model),
    }))
}

/// Lists the authenticated user's items, newest first
#[utoipa::path(
    get,
    path = "/api/items",
    security(("bearer_auth" = [])),
    params(UserHeader, ListItemsQuery),
    responses(
        (status = 200, description = "Items matching the query", body = ItemsResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    UserExtension(user): UserExtension,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let course_id = query
        .course_id
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(|raw| raw.parse::<Uuid>())
        .transpose()
        .map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "courseId must be a valid UUID",
            )
        })?;

    let filter = ItemFilter {
        item_type: query.item_type.clone(),
        status: query.status.clone(),
        course_id,
    };

    let items = ItemRepository::new(Arc::new(state.db.clone()));
    let models = items.list_by_owner(&user.0, &filter).await?;

    Ok(Json(ItemsResponse {
        items: models.into_iter().map(ItemInfo::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_client_field_names() {
        let request: CreateItemRequest = serde_json::from_str(
            r#"{
                "title": "Problem Set 3",
                "type": "assignment",
                "dueAt": "2026-09-01T23:59:00Z",
                "points": 100.0,
                "url": "https://example.edu/ps3",
                "courseId": "550e8400-e29b-41d4-a716-446655440000"
            }"#,
        )
        .unwrap();

        assert_eq!(request.title.as_deref(), Some("Problem Set 3"));
        assert_eq!(request.item_type.as_deref(), Some("assignment"));
        assert_eq!(request.due_at.as_deref(), Some("2026-09-01T23:59:00Z"));
        assert_eq!(request.points, Some(100.0));
        assert!(request.course_id.is_some());
    }

    #[test]
    fn item_info_serializes_type_field() {
        let info = ItemInfo {
            id: Uuid::new_v4(),
            course_id: None,
            source_id: None,
            title: "Quiz 1".to_string(),
            description: None,
            item_type: "quiz".to_string(),
            status: "pending".to_string(),
            due_at: None,
            points_possible: None,
            external_source: Some("manual".to_string()),
            external_url: None,
            metadata: None,
            created_at: "2026-08-01T00:00:00+00:00".to_string(),
            updated_at: "2026-08-01T00:00:00+00:00".to_string(),
        };

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json.get("type").unwrap(), "quiz");
        assert!(json.get("item_type").is_none());
    }

    #[test]
    fn list_query_parses_course_filter() {
        let query: ListItemsQuery =
            serde_json::from_str(r#"{"type": "exam", "courseId": "not-checked-here"}"#).unwrap();

        assert_eq!(query.item_type.as_deref(), Some("exam"));
        assert_eq!(query.course_id.as_deref(), Some("not-checked-here"));
        assert!(query.status.is_none());
    }
}
