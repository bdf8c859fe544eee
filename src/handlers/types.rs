//! # Common API Types
//!
//! This module contains shared types used across multiple API handlers,
//! including the sync statistics payload and the minimal acknowledgement
//! response.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repositories::SyncCounters;

/// Row counters reported after a completed provider sync
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Items inserted during this run
    #[schema(example = 12)]
    pub items_created: i32,
    /// Items updated during this run
    #[schema(example = 3)]
    pub items_updated: i32,
    /// Courses inserted during this run
    #[schema(example = 2)]
    pub courses_created: i32,
    /// Courses updated during this run
    #[schema(example = 1)]
    pub courses_updated: i32,
}

impl From<SyncCounters> for SyncStats {
    fn from(counters: SyncCounters) -> Self {
        Self {
            items_created: counters.items_created,
            items_updated: counters.items_updated,
            courses_created: counters.courses_created,
            courses_updated: counters.courses_updated,
        }
    }
}

/// Response payload for provider sync endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncResponse {
    /// Whether the sync completed
    pub success: bool,
    /// Human-readable confirmation
    pub message: String,
    /// Row counters for this run
    pub stats: SyncStats,
}

/// Minimal success acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Whether the operation completed
    pub success: bool,
    /// Human-readable confirmation
    pub message: String,
}
