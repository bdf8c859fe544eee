//! # Canvas Integration Handlers
//!
//! This module contains handlers for connecting a Canvas account, either by
//! pasting a personal access token or through the OAuth authorization-code
//! flow, and for triggering a Canvas sync.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Json, Redirect},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{UserExtension, UserHeader};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::types::SyncResponse;
use crate::providers::canvas::{
    CanvasTokenResponse, CanvasUser, encode_oauth_state, parse_oauth_state,
};
use crate::providers::{CanvasOAuthConfig, CanvasProvider, ProviderCredentials};
use crate::repositories::{IntegrationRepository, IntegrationSecretRepository, ProfileRepository};
use crate::server::AppState;
use crate::sync::run_provider_sync;

/// Request payload for connecting Canvas with a personal access token
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectCanvasRequest {
    /// Personal access token generated in Canvas account settings
    #[schema(example = "7~abcdef...")]
    pub access_token: String,
    /// Canvas instance URL; the configured default is used when omitted
    #[schema(example = "https://canvas.instructure.com")]
    pub canvas_url: Option<String>,
}

/// The Canvas account the token resolved to
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CanvasUserInfo {
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    pub email: Option<String>,
}

/// Response payload for a successful Canvas connect
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectCanvasResponse {
    pub success: bool,
    #[schema(example = "Canvas connected successfully")]
    pub message: String,
    pub user: CanvasUserInfo,
}

/// Query parameters Canvas appends to the OAuth redirect
#[derive(Debug, Deserialize, IntoParams)]
pub struct OAuthCallbackQuery {
    /// Authorization code to exchange for tokens
    pub code: Option<String>,
    /// Opaque state issued at flow start
    pub state: Option<String>,
    /// Set when the user denied access or Canvas rejected the request
    pub error: Option<String>,
}

fn oauth_config(config: &AppConfig) -> Option<CanvasOAuthConfig> {
    let client_id = config.canvas_client_id.clone()?;
    let client_secret = config.canvas_client_secret.clone()?;
    Some(CanvasOAuthConfig {
        client_id,
        client_secret,
        redirect_uri: config.canvas_redirect_uri.clone(),
        base_url: config.canvas_base_url.clone(),
    })
}

fn connect_redirect_error(code: &str) -> Redirect {
    Redirect::to(&format!("/connect?error={}", code))
}

/// Validates a Canvas token and stores the integration with its secrets
#[utoipa::path(
    post,
    path = "/api/integrations/canvas/token",
    security(("bearer_auth" = [])),
    params(UserHeader),
    request_body = ConnectCanvasRequest,
    responses(
        (status = 200, description = "Canvas connected", body = ConnectCanvasResponse),
        (status = 400, description = "Missing or invalid credentials", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn connect_canvas(
    State(state): State<AppState>,
    UserExtension(user): UserExtension,
    Json(request): Json<ConnectCanvasRequest>,
) -> Result<Json<ConnectCanvasResponse>, ApiError> {
    let access_token = request.access_token.trim().to_string();
    if access_token.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Access token is required",
        ));
    }

    let base_url = request
        .canvas_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| state.config.canvas_base_url.clone());

    let provider = CanvasProvider::new(state.config.canvas_base_url.clone());
    let credentials = ProviderCredentials {
        base_url: base_url.clone(),
        access_token: access_token.clone(),
    };

    let canvas_user = provider.fetch_user(&credentials).await.map_err(|err| {
        tracing::warn!(error = %err, "Canvas token validation failed");
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "PROVIDER_ERROR",
            "Invalid access token or Canvas URL. Please check your credentials.",
        )
    })?;

    let db = Arc::new(state.db.clone());
    ProfileRepository::new(Arc::clone(&db))
        .ensure_exists(&user.0)
        .await?;

    let integration = IntegrationRepository::new(Arc::clone(&db))
        .upsert(
            &user.0,
            "canvas",
            Some(canvas_user.id.to_string()),
            Some(format!("Canvas - {}", canvas_user.name)),
        )
        .await?;

    let secrets = IntegrationSecretRepository::new(db, state.crypto_key.clone());
    secrets
        .upsert_secret(&integration.id, "access_token", &access_token, None)
        .await?;
    secrets
        .upsert_secret(&integration.id, "canvas_url", &base_url, None)
        .await?;

    tracing::info!(
        user_id = %user.0,
        integration_id = %integration.id,
        "Canvas connected via access token"
    );

    Ok(Json(ConnectCanvasResponse {
        success: true,
        message: "Canvas connected successfully".to_string(),
        user: CanvasUserInfo {
            name: canvas_user.name,
            email: canvas_user.email,
        },
    }))
}

/// Starts the Canvas OAuth flow by redirecting to the authorize endpoint
#[utoipa::path(
    get,
    path = "/api/integrations/canvas/oauth",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 303, description = "Redirect to the Canvas authorize page"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 500, description = "OAuth app not configured", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn canvas_oauth(
    State(state): State<AppState>,
    UserExtension(user): UserExtension,
) -> Result<Redirect, ApiError> {
    let Some(oauth) = oauth_config(&state.config) else {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Canvas OAuth is not configured. Set EDMAP_CANVAS_CLIENT_ID and EDMAP_CANVAS_CLIENT_SECRET.",
        ));
    };

    let oauth_state = encode_oauth_state(user.0);
    let authorize_url = oauth.build_authorize_url(&oauth_state).map_err(|err| {
        tracing::error!(error = %err, "Failed to build Canvas authorize URL");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Failed to start Canvas OAuth flow",
        )
    })?;

    tracing::info!(user_id = %user.0, "Redirecting to Canvas OAuth authorize page");
    Ok(Redirect::to(authorize_url.as_str()))
}

/// Completes the Canvas OAuth flow.
///
/// Public endpoint; the browser arrives here straight from Canvas. Every
/// outcome is a redirect back to `/connect`, with the failure reason in the
/// `error` query parameter.
#[utoipa::path(
    get,
    path = "/api/integrations/canvas/callback",
    params(OAuthCallbackQuery),
    responses(
        (status = 303, description = "Redirect back to the connect page")
    ),
    tag = "integrations"
)]
pub async fn canvas_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Redirect {
    if let Some(error) = query.error {
        tracing::warn!(error = %error, "Canvas OAuth denied or rejected");
        return connect_redirect_error("canvas_oauth_failed");
    }

    let (Some(code), Some(raw_state)) = (query.code, query.state) else {
        return connect_redirect_error("invalid_oauth_response");
    };

    let Some(oauth_state) = parse_oauth_state(&raw_state) else {
        tracing::warn!("Canvas OAuth state failed validation");
        return connect_redirect_error("invalid_oauth_state");
    };

    let Some(oauth) = oauth_config(&state.config) else {
        tracing::error!("Canvas OAuth callback received but OAuth is not configured");
        return connect_redirect_error("canvas_oauth_failed");
    };

    let token = match oauth.exchange_code(&code).await {
        Ok(token) => token,
        Err(err) => {
            tracing::warn!(error = %err, "Canvas token exchange failed");
            return connect_redirect_error("token_exchange_failed");
        }
    };

    let credentials = ProviderCredentials {
        base_url: oauth.base_url.clone(),
        access_token: token.access_token.clone(),
    };
    let provider = CanvasProvider::new(oauth.base_url.clone());
    let canvas_user = match provider.fetch_user(&credentials).await {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!(error = %err, "Canvas user fetch failed after token exchange");
            return connect_redirect_error("canvas_user_fetch_failed");
        }
    };

    match store_oauth_connection(&state, &oauth_state.user_id, &canvas_user, &token).await {
        Ok(()) => {
            tracing::info!(user_id = %oauth_state.user_id, "Canvas connected via OAuth");
            Redirect::to("/connect?success=canvas_connected")
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to persist Canvas OAuth connection");
            connect_redirect_error("callback_processing_failed")
        }
    }
}

async fn store_oauth_connection(
    state: &AppState,
    user_id: &Uuid,
    canvas_user: &CanvasUser,
    token: &CanvasTokenResponse,
) -> anyhow::Result<()> {
    let db = Arc::new(state.db.clone());
    ProfileRepository::new(Arc::clone(&db))
        .ensure_exists(user_id)
        .await?;

    let integration = IntegrationRepository::new(Arc::clone(&db))
        .upsert(
            user_id,
            "canvas",
            Some(canvas_user.id.to_string()),
            Some(format!("Canvas - {}", canvas_user.name)),
        )
        .await?;

    let secrets = IntegrationSecretRepository::new(db, state.crypto_key.clone());
    let expires_at = token
        .expires_in
        .map(|seconds| Utc::now() + Duration::seconds(seconds));
    secrets
        .upsert_secret(&integration.id, "access_token", &token.access_token, expires_at)
        .await?;

    // A missing refresh token only means re-authorization later
    if let Some(refresh_token) = &token.refresh_token {
        if let Err(err) = secrets
            .upsert_secret(&integration.id, "refresh_token", refresh_token, None)
            .await
        {
            tracing::warn!(error = %err, "Failed to store Canvas refresh token");
        }
    }

    Ok(())
}

/// Pulls courses and assignments from Canvas into the local database
#[utoipa::path(
    post,
    path = "/api/integrations/canvas/sync",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Sync completed", body = SyncResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Canvas is not connected", body = ApiError),
        (status = 502, description = "Canvas rejected the sync", body = ApiError)
    ),
    tag = "integrations"
)]
pub async fn sync_canvas(
    State(state): State<AppState>,
    UserExtension(user): UserExtension,
) -> Result<Json<SyncResponse>, ApiError> {
    let db = Arc::new(state.db.clone());
    let counters = run_provider_sync(&db, &state.crypto_key, &user.0, "canvas").await?;

    Ok(Json(SyncResponse {
        success: true,
        message: "Canvas data synced successfully".to_string(),
        stats: counters.into(),
    }))
}
