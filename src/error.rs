//! API error responses.
//!
//! Every failing route answers with one `ApiError` body, serialized as
//! `application/problem+json`: a human message under `error`, a stable
//! machine `code`, optional structured `details`, and the request's trace
//! id. Handlers either build one directly or lean on the `From` impls and
//! the helper constructors at the bottom of this module.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::telemetry;

/// Upstream body text longer than this is cut before it reaches a response.
const DETAIL_SNIPPET_CHARS: usize = 200;

/// One API error, carried as a value until `IntoResponse` turns it into the
/// problem+json body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// Response status; never serialized, the body repeats nothing HTTP
    /// already says.
    #[serde(skip)]
    pub status: StatusCode,
    /// Stable SCREAMING_SNAKE_CASE code clients can branch on.
    pub code: Box<str>,
    /// Human-readable message, serialized under the `error` key.
    #[serde(rename = "error")]
    pub message: Box<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Trace id of the request this error belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: resolve_trace_id(),
        }
    }

    /// Attaches structured details to the body.
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }
}

/// The task-local trace id when the error is built inside a request scope,
/// otherwise a short generated correlation id so log lines and the client
/// body can still be matched up.
fn resolve_trace_id() -> Option<Box<str>> {
    telemetry::current_trace_id()
        .map(String::into_boxed_str)
        .or_else(|| {
            let id = uuid::Uuid::new_v4().simple().to_string();
            Some(format!("corr-{}", &id[..8]).into_boxed_str())
        })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        // The chain is for the logs; the client gets a generic body
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "unique constraint violation");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Record not found: {record}"),
            ),
            sea_orm::DbErr::Conn(conn_err) => {
                tracing::error!("Database connection error: {:?}", conn_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

/// Unique-constraint detection for the two backends in play: Postgres
/// reports SQLSTATE 23505, SQLite reports extended codes 1555/2067. The
/// driver-level `is_unique_violation` is consulted first since it already
/// knows both.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    matches!(
        db_error.code().as_deref(),
        Some("23505") | Some("1555") | Some("2067")
    )
}

/// 401 with the standard code; `None` falls back to a generic message.
pub fn unauthorized(message: Option<&str>) -> ApiError {
    ApiError::new(
        StatusCode::UNAUTHORIZED,
        "UNAUTHORIZED",
        message.unwrap_or("Authentication required"),
    )
}

/// 401 carrying a caller-supplied trace id. The auth middleware runs before
/// the task-local scope exists, so it passes the id it just minted.
pub fn unauthorized_with_trace_id(message: Option<&str>, trace_id: String) -> ApiError {
    let mut error = unauthorized(message);
    error.trace_id = Some(trace_id.into_boxed_str());
    error
}

/// 404 for a missing integration or credential.
pub fn not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

/// 500 after a sync run has been marked failed. The provider's own words
/// (status line and body, cut to a snippet) travel in `details`; providers
/// can return whole HTML pages on failure.
pub fn sync_failed(provider: &str, details: &str) -> ApiError {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "SYNC_FAILED",
        format!("Failed to sync {provider} data"),
    )
    .with_details(json!({ "details": snippet(details) }))
}

fn snippet(text: &str) -> String {
    if text.chars().count() > DETAIL_SNIPPET_CHARS {
        let cut: String = text.chars().take(DETAIL_SNIPPET_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
