//! # Graph API Handler
//!
//! This module contains the handler that assembles the positioned
//! course/source/item graph for the dashboard canvas.

use std::sync::Arc;

use axum::{extract::State, response::Json};

use crate::auth::{UserExtension, UserHeader};
use crate::error::ApiError;
use crate::graph::{DEFAULT_LAYOUT_SEED, GraphData, build_graph};
use crate::repositories::{CourseRepository, ItemRepository, SourceRepository};
use crate::server::AppState;

/// Returns the authenticated user's node graph with computed positions
#[utoipa::path(
    get,
    path = "/api/graph",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Positioned node graph", body = GraphData),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "graph"
)]
pub async fn get_graph(
    State(state): State<AppState>,
    UserExtension(user): UserExtension,
) -> Result<Json<GraphData>, ApiError> {
    let db = Arc::new(state.db.clone());

    let courses = CourseRepository::new(db.clone()).find_by_owner(&user.0).await?;
    let sources = SourceRepository::new(db.clone()).find_by_owner(&user.0).await?;
    let items = ItemRepository::new(db).find_by_owner_due_order(&user.0).await?;

    tracing::debug!(
        courses = courses.len(),
        sources = sources.len(),
        items = items.len(),
        "Building graph"
    );

    Ok(Json(build_graph(&courses, &sources, &items, DEFAULT_LAYOUT_SEED)))
}
