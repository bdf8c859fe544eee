//! # Data Models
//!
//! This module contains all the data models used throughout the EdMap API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod course;
pub mod integration;
pub mod integration_secret;
pub mod item;
pub mod profile;
pub mod source;
pub mod sync_run;

pub use course::Entity as Course;
pub use integration::Entity as Integration;
pub use integration_secret::Entity as IntegrationSecret;
pub use item::Entity as Item;
pub use profile::Entity as Profile;
pub use source::Entity as Source;
pub use sync_run::Entity as SyncRun;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "edmap-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
