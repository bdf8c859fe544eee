//! # ICS Import Handler
//!
//! This module contains the handler that accepts a calendar file upload or
//! a remote calendar URL and imports its events as items under a synthetic
//! import course.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    extract::multipart::MultipartError,
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{UserExtension, UserHeader};
use crate::error::ApiError;
use crate::ics::{ImportError, ImportStats, import_calendar};
use crate::server::AppState;

/// Multipart form for ICS imports, documented for OpenAPI
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct IcalImportForm {
    /// Uploaded calendar file; the filename must end in `.ics`
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<String>,
    /// Remote calendar URL, used when no file is uploaded
    pub url: Option<String>,
    /// Name for the synthetic import course
    #[serde(rename = "sourceName")]
    pub source_name: Option<String>,
}

/// Response payload for an ICS import
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IcalImportResponse {
    /// Whether the import completed
    pub success: bool,
    /// Human-readable confirmation
    pub message: String,
    /// Event counters for this import
    pub stats: ImportStats,
}

fn invalid_multipart(err: MultipartError) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "VALIDATION_FAILED",
        &format!("Invalid multipart body: {}", err),
    )
}

/// Fetches calendar content over HTTP; any failure is treated as bad input
async fn fetch_remote_calendar(url: &str) -> Result<String, ApiError> {
    let fetch_failed = || {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Failed to fetch ICS from URL",
        )
    };

    let response = reqwest::get(url).await.map_err(|err| {
        tracing::warn!(error = %err, "ICS URL fetch failed");
        fetch_failed()
    })?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "ICS URL fetch returned error status");
        return Err(fetch_failed());
    }

    response.text().await.map_err(|err| {
        tracing::warn!(error = %err, "ICS URL body read failed");
        fetch_failed()
    })
}

/// Imports an ICS calendar from an uploaded file or a URL
#[utoipa::path(
    post,
    path = "/api/integrations/ical/import",
    security(("bearer_auth" = [])),
    params(UserHeader),
    request_body(content = IcalImportForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import completed", body = IcalImportResponse),
        (status = 400, description = "Missing input or unparseable calendar", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn import_ical(
    State(state): State<AppState>,
    UserExtension(user): UserExtension,
    mut multipart: Multipart,
) -> Result<Json<IcalImportResponse>, ApiError> {
    let mut file_content: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut url: Option<String> = None;
    let mut source_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                file_content = Some(field.text().await.map_err(invalid_multipart)?);
            }
            "url" => url = Some(field.text().await.map_err(invalid_multipart)?),
            "sourceName" => source_name = Some(field.text().await.map_err(invalid_multipart)?),
            _ => {}
        }
    }

    let source_name = source_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "ICS Import".to_string());

    // An uploaded file wins over a URL when both are supplied
    let (content, source_url) = if let Some(content) = file_content {
        let is_ics = file_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().ends_with(".ics"));
        if !is_ics {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "File must be an ICS file",
            ));
        }
        (content, None)
    } else if let Some(url) = url.filter(|url| !url.trim().is_empty()) {
        let fetched = fetch_remote_calendar(&url).await?;
        (fetched, Some(url))
    } else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Either file or URL is required",
        ));
    };

    let db = Arc::new(state.db.clone());
    let stats = import_calendar(&db, &user.0, &content, &source_name, source_url.as_deref())
        .await
        .map_err(|err| match err {
            ImportError::InvalidFormat(parse_err) => {
                tracing::warn!(error = %parse_err, "Rejected unparseable ICS upload");
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_FAILED",
                    "Invalid ICS file format",
                )
            }
            ImportError::Database(db_err) => ApiError::from(db_err),
        })?;

    Ok(Json(IcalImportResponse {
        success: true,
        message: "ICS import completed successfully".to_string(),
        stats,
    }))
}
