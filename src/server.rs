//! # Server Configuration
//!
//! This module contains the server setup and configuration for the EdMap API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::handlers;
use crate::telemetry;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub crypto_key: CryptoKey,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    // The OAuth callback arrives straight from the browser, so it cannot
    // carry bearer credentials
    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/api/integrations/canvas/callback",
            get(handlers::canvas::canvas_callback),
        );

    let protected = Router::new()
        .route(
            "/api/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route("/api/graph", get(handlers::graph::get_graph))
        .route(
            "/api/integrations/canvas/token",
            post(handlers::canvas::connect_canvas),
        )
        .route(
            "/api/integrations/canvas/oauth",
            get(handlers::canvas::canvas_oauth),
        )
        .route(
            "/api/integrations/canvas/sync",
            post(handlers::canvas::sync_canvas),
        )
        .route(
            "/api/integrations/prairielearn/token",
            post(handlers::prairielearn::connect_prairielearn),
        )
        .route(
            "/api/integrations/prairielearn/sync",
            post(handlers::prairielearn::sync_prairielearn),
        )
        .route(
            "/api/integrations/gradescope/login",
            post(handlers::gradescope::gradescope_login),
        )
        .route(
            "/api/integrations/gradescope/courses",
            get(handlers::gradescope::gradescope_courses),
        )
        .route(
            "/api/integrations/gradescope/courses/{course_id}/assignments",
            get(handlers::gradescope::gradescope_assignments),
        )
        .route(
            "/api/integrations/ical/import",
            post(handlers::ical::import_ical),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(telemetry::trace_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    // ConfigLoader::load has already validated presence and length; this
    // guards configs built by hand
    let crypto_key = CryptoKey::new(config.crypto_key.clone().unwrap_or_default())
        .map_err(|e| format!("Invalid crypto key: {}", e))?;

    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let profile = config.profile.clone();
    let state = AppState {
        config: Arc::new(config),
        db,
        crypto_key,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, profile = %profile, "EdMap API listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::items::create_item,
        crate::handlers::items::list_items,
        crate::handlers::graph::get_graph,
        crate::handlers::canvas::connect_canvas,
        crate::handlers::canvas::canvas_oauth,
        crate::handlers::canvas::canvas_callback,
        crate::handlers::canvas::sync_canvas,
        crate::handlers::prairielearn::connect_prairielearn,
        crate::handlers::prairielearn::sync_prairielearn,
        crate::handlers::gradescope::gradescope_login,
        crate::handlers::gradescope::gradescope_courses,
        crate::handlers::gradescope::gradescope_assignments,
        crate::handlers::ical::import_ical,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::handlers::types::SyncStats,
            crate::handlers::types::SyncResponse,
            crate::handlers::types::StatusResponse,
            crate::handlers::items::CreateItemRequest,
            crate::handlers::items::CreateItemResponse,
            crate::handlers::items::ItemInfo,
            crate::handlers::items::ItemsResponse,
            crate::handlers::canvas::ConnectCanvasRequest,
            crate::handlers::canvas::ConnectCanvasResponse,
            crate::handlers::canvas::CanvasUserInfo,
            crate::handlers::prairielearn::ConnectPrairieLearnRequest,
            crate::handlers::prairielearn::ConnectPrairieLearnResponse,
            crate::handlers::prairielearn::PrairieLearnUserInfo,
            crate::handlers::gradescope::GradescopeLoginRequest,
            crate::handlers::ical::IcalImportForm,
            crate::handlers::ical::IcalImportResponse,
            crate::ics::ImportStats,
            crate::graph::GraphData,
            crate::graph::GraphNode,
            crate::graph::GraphEdge,
            crate::graph::GraphNodeData,
            crate::graph::GraphPosition,
            crate::error::ApiError,
        )
    ),
    info(
        title = "EdMap API",
        description = "Backend API for the EdMap student dashboard",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
