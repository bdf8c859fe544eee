//! # Gradescope Integration Handlers
//!
//! This module contains handlers that proxy the local Gradescope helper
//! service: session login plus course and assignment listings. Helper
//! responses are passed through unchanged so the frontend sees the same
//! payloads the helper produces.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::{UserExtension, UserHeader};
use crate::error::ApiError;
use crate::handlers::types::StatusResponse;
use crate::providers::{GradescopeClient, ProviderError};
use crate::repositories::{IntegrationRepository, ProfileRepository};
use crate::server::AppState;

/// Request payload for a Gradescope session login
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct GradescopeLoginRequest {
    #[schema(example = "student@example.edu")]
    pub email: String,
    pub password: String,
}

fn map_gradescope_error(err: ProviderError) -> ApiError {
    match err {
        ProviderError::ApiError { status, message } => ApiError::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "PROVIDER_ERROR",
            &message,
        ),
        other => {
            tracing::error!(error = %other, "Gradescope helper unreachable");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Failed to connect to Gradescope API",
            )
        }
    }
}

/// Logs in to Gradescope through the helper service and records the
/// integration
#[utoipa::path(
    post,
    path = "/api/integrations/gradescope/login",
    security(("bearer_auth" = [])),
    params(UserHeader),
    request_body = GradescopeLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = StatusResponse),
        (status = 400, description = "Missing credentials", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn gradescope_login(
    State(state): State<AppState>,
    UserExtension(user): UserExtension,
    Json(request): Json<GradescopeLoginRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let email = request.email.trim().to_string();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Email and password are required",
        ));
    }

    let client = GradescopeClient::new(state.config.gradescope_api_url.clone());
    client
        .login(&email, &request.password)
        .await
        .map_err(map_gradescope_error)?;

    let db = Arc::new(state.db.clone());
    ProfileRepository::new(Arc::clone(&db))
        .ensure_exists(&user.0)
        .await?;
    IntegrationRepository::new(db)
        .upsert(
            &user.0,
            "gradescope",
            None,
            Some(format!("Gradescope - {}", email)),
        )
        .await?;

    tracing::info!(user_id = %user.0, "Gradescope session established");

    Ok(Json(StatusResponse {
        success: true,
        message: "Gradescope connected successfully".to_string(),
    }))
}

/// Lists the Gradescope courses of the active helper session
#[utoipa::path(
    get,
    path = "/api/integrations/gradescope/courses",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Course list from the helper", body = Value),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn gradescope_courses(
    State(state): State<AppState>,
    UserExtension(_user): UserExtension,
) -> Result<Json<Value>, ApiError> {
    let client = GradescopeClient::new(state.config.gradescope_api_url.clone());
    let courses = client.courses().await.map_err(map_gradescope_error)?;
    Ok(Json(courses))
}

/// Lists the assignments of one Gradescope course
#[utoipa::path(
    get,
    path = "/api/integrations/gradescope/courses/{course_id}/assignments",
    security(("bearer_auth" = [])),
    params(
        UserHeader,
        ("course_id" = String, Path, description = "Gradescope course identifier")
    ),
    responses(
        (status = 200, description = "Assignment list from the helper", body = Value),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn gradescope_assignments(
    State(state): State<AppState>,
    UserExtension(_user): UserExtension,
    Path(course_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let client = GradescopeClient::new(state.config.gradescope_api_url.clone());
    let assignments = client
        .assignments(&course_id)
        .await
        .map_err(map_gradescope_error)?;
    Ok(Json(assignments))
}
