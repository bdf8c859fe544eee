//! Canvas provider implementation
//!
//! Canvas LMS provider supporting direct access-token auth, the OAuth2 web
//! flow, and REST fetches for active courses plus their assignments and
//! quizzes.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::providers::trait_::{
    CourseProvider, ProviderCredentials, ProviderError, RemoteCourse, RemoteItem,
    parse_provider_datetime,
};

/// How long an OAuth state token stays valid
const OAUTH_STATE_MAX_AGE_MS: i64 = 10 * 60 * 1000;

/// Scopes requested during the Canvas OAuth flow
const OAUTH_SCOPES: &str = "url:GET|/api/v1/courses url:GET|/api/v1/users/self url:GET|/api/v1/courses/:course_id/assignments url:GET|/api/v1/courses/:course_id/quizzes url:GET|/api/v1/calendar_events";

/// Canvas course provider
#[derive(Clone)]
pub struct CanvasProvider {
    base_url: String,
    client: reqwest::Client,
}

/// Canvas OAuth app configuration
#[derive(Debug, Clone)]
pub struct CanvasOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub base_url: String,
}

/// State payload round-tripped through the Canvas OAuth flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub user_id: Uuid,
    pub provider: String,
    /// Unix milliseconds at issuance
    pub timestamp: i64,
}

/// The authenticated Canvas user, used for credential validation
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub login_id: Option<String>,
}

/// Token endpoint response for the authorization-code grant
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CanvasCourse {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    course_code: Option<String>,
    #[serde(default)]
    enrollment_state: Option<String>,
    #[serde(default)]
    total_students: Option<i64>,
    #[serde(default)]
    start_at: Option<String>,
    #[serde(default)]
    end_at: Option<String>,
    #[serde(default)]
    workflow_state: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CanvasAssignment {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_at: Option<String>,
    #[serde(default)]
    points_possible: Option<f64>,
    #[serde(default)]
    submission_types: Option<Vec<String>>,
    #[serde(default)]
    allowed_attempts: Option<i64>,
    #[serde(default)]
    unlock_at: Option<String>,
    #[serde(default)]
    lock_at: Option<String>,
    #[serde(default)]
    published: Option<bool>,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CanvasQuiz {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_at: Option<String>,
    #[serde(default)]
    points_possible: Option<f64>,
    #[serde(default)]
    quiz_type: Option<String>,
    #[serde(default)]
    allowed_attempts: Option<i64>,
    #[serde(default)]
    unlock_at: Option<String>,
    #[serde(default)]
    lock_at: Option<String>,
    #[serde(default)]
    published: Option<bool>,
    #[serde(default)]
    html_url: Option<String>,
}

impl CanvasProvider {
    /// Create a new Canvas provider with the given default instance URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the authenticated user, validating the token against the instance
    pub async fn fetch_user(
        &self,
        credentials: &ProviderCredentials,
    ) -> Result<CanvasUser, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/v1/users/self", credentials.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", credentials.access_token),
            )
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if response.status().is_success() {
            let user: CanvasUser = response.json().await?;
            Ok(user)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::ApiError {
                status,
                message: format!("Failed to fetch Canvas user: {}", body),
            })
        }
    }

    async fn fetch_assignments(
        &self,
        credentials: &ProviderCredentials,
        course_id: &str,
    ) -> Result<Vec<CanvasAssignment>, ProviderError> {
        let response = self
            .client
            .get(format!(
                "{}/api/v1/courses/{}/assignments?include[]=submission_types&include[]=due_at&per_page=100",
                credentials.base_url, course_id
            ))
            .header(
                "Authorization",
                format!("Bearer {}", credentials.access_token),
            )
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
                message: format!("Failed to fetch Canvas assignments: {}", body),
            })
        }
    }

    async fn fetch_quizzes(
        &self,
        credentials: &ProviderCredentials,
        course_id: &str,
    ) -> Result<Vec<CanvasQuiz>, ProviderError> {
        let response = self
            .client
            .get(format!(
                "{}/api/v1/courses/{}/quizzes?include[]=due_at&per_page=100",
                credentials.base_url, course_id
            ))
            .header(
                "Authorization",
                format!("Bearer {}", credentials.access_token),
            )
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
                message: format!("Failed to fetch Canvas quizzes: {}", body),
            })
        }
    }
}

#[async_trait]
impl CourseProvider for CanvasProvider {
    fn slug(&self) -> &'static str {
        "canvas"
    }

    fn display_name(&self) -> &'static str {
        "Canvas"
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
            .get(format!(
                "{}/api/v1/courses?enrollment_state=active&include[]=total_students",
                credentials.base_url
            ))
            .header(
                "Authorization",
                format!("Bearer {}", credentials.access_token),
            )
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: format!("Failed to fetch Canvas courses: {}", body),
            });
        }

        let courses: Vec<CanvasCourse> = response.json().await?;

        Ok(courses
            .into_iter()
            .map(|course| RemoteCourse {
                external_id: course.id.to_string(),
                title: course.name.clone().unwrap_or_else(|| "Untitled".to_string()),
                code: course.course_code.clone(),
                term: None,
                external_url: course.html_url.clone(),
                metadata: serde_json::json!({
                    "canvas_course_id": course.id,
                    "enrollment_state": course.enrollment_state,
                    "total_students": course.total_students,
                    "start_at": course.start_at,
                    "end_at": course.end_at,
                    "workflow_state": course.workflow_state,
                }),
            })
            .collect())
    }

    async fn fetch_course_items(
        &self,
        credentials: &ProviderCredentials,
        course: &RemoteCourse,
    ) -> Result<Vec<RemoteItem>, ProviderError> {
        let mut items = Vec::new();

        for assignment in self
            .fetch_assignments(credentials, &course.external_id)
            .await?
        {
            items.push(RemoteItem {
                external_id: assignment.id.to_string(),
                title: assignment
                    .name
                    .clone()
                    .unwrap_or_else(|| "Untitled".to_string()),
                description: Some(assignment.description.clone().unwrap_or_default()),
                item_type: "assignment".to_string(),
                due_at: assignment.due_at.as_deref().and_then(parse_provider_datetime),
                points_possible: assignment.points_possible,
                external_url: assignment.html_url.clone(),
                metadata: serde_json::json!({
                    "canvas_assignment_id": assignment.id,
                    "submission_types": assignment.submission_types,
                    "allowed_attempts": assignment.allowed_attempts,
                    "unlock_at": assignment.unlock_at,
                    "lock_at": assignment.lock_at,
                    "published": assignment.published,
                }),
            });
        }

        for quiz in self.fetch_quizzes(credentials, &course.external_id).await? {
            items.push(RemoteItem {
                external_id: quiz.id.to_string(),
                title: quiz.title.clone().unwrap_or_else(|| "Untitled".to_string()),
                description: Some(quiz.description.clone().unwrap_or_default()),
                item_type: "quiz".to_string(),
                due_at: quiz.due_at.as_deref().and_then(parse_provider_datetime),
                points_possible: quiz.points_possible,
                external_url: quiz.html_url.clone(),
                metadata: serde_json::json!({
                    "canvas_quiz_id": quiz.id,
                    "quiz_type": quiz.quiz_type,
                    "allowed_attempts": quiz.allowed_attempts,
                    "unlock_at": quiz.unlock_at,
                    "lock_at": quiz.lock_at,
                    "published": quiz.published,
                }),
            });
        }

        Ok(items)
    }
}

impl CanvasOAuthConfig {
    /// Build the Canvas OAuth authorize URL carrying an encoded state
    pub fn build_authorize_url(&self, state: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/login/oauth2/auth", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state)
            .append_pair("scope", OAUTH_SCOPES);

        Ok(url)
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<CanvasTokenResponse, ProviderError> {
        let client = reqwest::Client::new();

        let mut params = std::collections::HashMap::new();
        params.insert("grant_type", "authorization_code".to_string());
        params.insert("client_id", self.client_id.clone());
        params.insert("client_secret", self.client_secret.clone());
        params.insert("code", code.to_string());
        params.insert("redirect_uri", self.redirect_uri.clone());

        let response = client
            .post(format!("{}/login/oauth2/token", self.base_url))
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::OAuthError(format!(
                "Token exchange failed: {} - {}",
                status, body
            )))
        }
    }
}

/// Encode an OAuth state payload for the given user
pub fn encode_oauth_state(user_id: Uuid) -> String {
    let state = OAuthState {
        user_id,
        provider: "canvas".to_string(),
        timestamp: Utc::now().timestamp_millis(),
    };
    // Serialization of a plain struct cannot fail
    let json = serde_json::to_vec(&state).unwrap_or_default();
    base64_url::encode(&json)
}

/// Decode and validate an OAuth state payload.
///
/// Rejects unparseable states, states for another provider, and states older
/// than ten minutes.
pub fn parse_oauth_state(state: &str) -> Option<OAuthState> {
    let bytes = base64_url::decode(state).ok()?;
    let parsed: OAuthState = serde_json::from_slice(&bytes).ok()?;

    if parsed.provider != "canvas" {
        return None;
    }

    let age_ms = Utc::now().timestamp_millis() - parsed.timestamp;
    if !(0..=OAUTH_STATE_MAX_AGE_MS).contains(&age_ms) {
        return None;
    }

    Some(parsed)
}
