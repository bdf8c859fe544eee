//! Course provider trait definition
//!
//! Defines the standard interface that all course provider implementations
//! must follow: fetch the user's course list, then per course its assessable
//! items, in a provider-neutral shape the sync pipeline can upsert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Provider-specific error types for structured error handling
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("OAuth authentication failed: {0}")]
    OAuthError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl ProviderError {
    /// Upstream HTTP status, when the error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Credential material for one provider call: the instance to talk to and
/// the user's stored token.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub base_url: String,
    pub access_token: String,
}

/// A course as reported by a provider, before persistence
#[derive(Debug, Clone)]
pub struct RemoteCourse {
    /// Stable provider-side identifier
    pub external_id: String,
    pub title: String,
    pub code: Option<String>,
    pub term: Option<String>,
    pub external_url: Option<String>,
    /// Provider-specific fields preserved verbatim
    pub metadata: JsonValue,
}

/// An assessable item (assignment, quiz, assessment) as reported by a provider
#[derive(Debug, Clone)]
pub struct RemoteItem {
    /// Stable provider-side identifier
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub item_type: String,
    pub due_at: Option<DateTime<Utc>>,
    pub points_possible: Option<f64>,
    pub external_url: Option<String>,
    /// Provider-specific fields preserved verbatim
    pub metadata: JsonValue,
}

#[async_trait]
pub trait CourseProvider: Send + Sync {
    /// Stable provider slug (`canvas`, `prairielearn`)
    fn slug(&self) -> &'static str;

    /// Capitalized name used in user-facing messages
    fn display_name(&self) -> &'static str;

    /// Base URL to use when the user has no stored instance URL
    fn default_base_url(&self) -> &str;

    /// Fetch the user's active course list.
    async fn fetch_courses(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Vec<RemoteCourse>, ProviderError>;

    /// Fetch the assessable items for one course.
    async fn fetch_course_items(
        &self,
        credentials: &ProviderCredentials,
        course: &RemoteCourse,
    ) -> Result<Vec<RemoteItem>, ProviderError>;
}

/// Parses the ISO 8601 timestamps providers return for due dates.
///
/// Unparseable values become `None`; the upsert path then treats the item as
/// having no due date rather than failing the sync.
pub fn parse_provider_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
