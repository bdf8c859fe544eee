//! Gradescope proxy client
//!
//! Gradescope has no official API; an unofficial local helper service wraps
//! its session-based web interface. This client forwards requests to the
//! helper and passes upstream bodies and statuses through unchanged.

use serde_json::Value as JsonValue;

use crate::providers::trait_::ProviderError;

/// Client for the local Gradescope helper service
#[derive(Clone)]
pub struct GradescopeClient {
    base_url: String,
    client: reqwest::Client,
}

impl GradescopeClient {
    /// Create a new client targeting the given helper base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Log in to Gradescope through the helper, establishing its session
    pub async fn login(&self, email: &str, password: &str) -> Result<JsonValue, ProviderError> {
        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        Self::passthrough(response, "Login failed").await
    }

    /// List the logged-in user's courses
    pub async fn courses(&self) -> Result<JsonValue, ProviderError> {
        let response = self
            .client
            .get(format!("{}/courses", self.base_url))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        Self::passthrough(response, "Failed to fetch courses").await
    }

    /// List the assignments of one course
    pub async fn assignments(&self, course_id: &str) -> Result<JsonValue, ProviderError> {
        let response = self
            .client
            .get(format!("{}/courses/{}/assignments", self.base_url, course_id))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        Self::passthrough(response, "Failed to fetch assignments").await
    }

    /// Returns the upstream JSON on success; on failure surfaces the
    /// upstream status with its `detail` field as the message.
    async fn passthrough(
        response: reqwest::Response,
        fallback_message: &str,
    ) -> Result<JsonValue, ProviderError> {
        let status = response.status().as_u16();
        let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);

        if (200..300).contains(&status) {
            return Ok(body);
        }

        let message = body
            .get("detail")
            .and_then(|detail| detail.as_str())
            .unwrap_or(fallback_message)
            .to_string();

        Err(ProviderError::ApiError { status, message })
    }
}
