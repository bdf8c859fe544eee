//! PrairieLearn provider implementation
//!
//! PrairieLearn provider using personal access tokens (`Private-Token`
//! header) and REST fetches for courses and their assessments.

use async_trait::async_trait;
use serde::Deserialize;

use crate::providers::trait_::{
    CourseProvider, ProviderCredentials, ProviderError, RemoteCourse, RemoteItem,
    parse_provider_datetime,
};

/// PrairieLearn course provider
#[derive(Clone)]
pub struct PrairieLearnProvider {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PrairieLearnCourse {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    institution: Option<String>,
    #[serde(default)]
    display_timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrairieLearnAssessment {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type", default)]
    assessment_type: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    points: Option<f64>,
    #[serde(default)]
    course_id: Option<i64>,
}

/// Appends `/pl` to an instance URL when absent, tolerating a trailing slash.
///
/// PrairieLearn serves its API under the `/pl` prefix but users paste the
/// bare host.
pub fn normalize_base_url(url: &str) -> String {
    if url.ends_with("/pl") {
        url.to_string()
    } else if url.ends_with('/') {
        format!("{}pl", url)
    } else {
        format!("{}/pl", url)
    }
}

impl PrairieLearnProvider {
    /// Create a new PrairieLearn provider with the given default instance URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: normalize_base_url(&base_url),
            client: reqwest::Client::new(),
        }
    }

    /// Validate a token by listing courses, returning the course count.
    ///
    /// Distinguishes the failure modes users actually hit: a bad token (401),
    /// a wrong URL (404), and an instance answering with an HTML login page
    /// instead of JSON.
    pub async fn validate_token(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<usize, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/v1/courses", credentials.base_url))
            .header("Private-Token", &credentials.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let is_json = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.contains("application/json"));

            if !is_json {
                return Err(ProviderError::ApiError {
                    status: status.as_u16(),
                    message: "PrairieLearn API returned HTML instead of JSON. This suggests an authentication or session issue.".to_string(),
                });
            }

            let courses: serde_json::Value = response.json().await?;
            return Ok(courses.as_array().map_or(0, |list| list.len()));
        }

        let message = match status.as_u16() {
            401 => "Invalid access token - authentication failed".to_string(),
            404 => "PrairieLearn API endpoint not found. Please check the URL.".to_string(),
            code => format!(
                "PrairieLearn API error: {} - {}",
                code,
                status.canonical_reason().unwrap_or("unknown")
            ),
        };

        Err(ProviderError::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_assessments(
        &self,
        credentials: &ProviderCredentials,
        course_id: &str,
    ) -> Result<Vec<PrairieLearnAssessment>, ProviderError> {
        let response = self
            .client
            .get(format!(
                "{}/api/v1/courses/{}/assessments",
                credentials.base_url, course_id
            ))
            .header("Private-Token", &credentials.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::ApiError {
                status,
                message: format!("Failed to fetch PrairieLearn assessments: {}", body),
            })
        }
    }
}

#[async_trait]
impl CourseProvider for PrairieLearnProvider {
    fn slug(&self) -> &'static str {
        "prairielearn"
    }

    fn display_name(&self) -> &'static str {
        "PrairieLearn"
    }

    fn default_base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_courses(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<Vec<RemoteCourse>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/v1/courses", credentials.base_url))
            .header("Private-Token", &credentials.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: format!("Failed to fetch PrairieLearn courses: {}", body),
            });
        }

        let courses: Vec<PrairieLearnCourse> = response.json().await?;

        Ok(courses
            .into_iter()
            .map(|course| RemoteCourse {
                external_id: course.id.to_string(),
                title: course
                    .title
                    .clone()
                    .unwrap_or_else(|| "Untitled".to_string()),
                code: course.short_name.clone(),
                term: course.institution.clone(),
                external_url: None,
                metadata: serde_json::json!({
                    "prairielearn_course_id": course.id,
                    "institution": course.institution,
                    "timezone": course.display_timezone,
                }),
            })
            .collect())
    }

    async fn fetch_course_items(
        &self,
        credentials: &ProviderCredentials,
        course: &RemoteCourse,
    ) -> Result<Vec<RemoteItem>, ProviderError> {
        let assessments = self
            .fetch_assessments(credentials, &course.external_id)
            .await?;

        Ok(assessments
            .into_iter()
            .map(|assessment| RemoteItem {
                external_id: assessment.id.to_string(),
                title: assessment
                    .title
                    .clone()
                    .unwrap_or_else(|| "Untitled".to_string()),
                description: None,
                item_type: assessment
                    .assessment_type
                    .clone()
                    .unwrap_or_else(|| "assignment".to_string()),
                due_at: assessment
                    .due_date
                    .as_deref()
                    .and_then(parse_provider_datetime),
                points_possible: assessment.points,
                external_url: None,
                metadata: serde_json::json!({
                    "prairielearn_assessment_id": assessment.id,
                    "course_id": assessment.course_id,
                    "assessment_type": assessment.assessment_type,
                }),
            })
            .collect())
    }
}
