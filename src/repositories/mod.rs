//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities, providing a clean API for data access with owner-scoped methods.

pub mod course;
pub mod integration;
pub mod integration_secret;
pub mod item;
pub mod profile;
pub mod source;
pub mod sync_run;

pub use course::CourseRepository;
pub use integration::IntegrationRepository;
pub use integration_secret::IntegrationSecretRepository;
pub use item::{ItemFilter, ItemRepository};
pub use profile::ProfileRepository;
pub use source::SourceRepository;
pub use sync_run::{SyncCounters, SyncRunRepository};
