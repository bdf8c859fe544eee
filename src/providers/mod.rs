//! # Course Providers
//!
//! This module contains the provider abstraction for external course systems
//! (Canvas, PrairieLearn) plus the Gradescope helper client, and a registry
//! mapping provider slugs to implementations.

pub mod canvas;
pub mod gradescope;
pub mod prairielearn;
pub mod registry;
pub mod trait_;

pub use canvas::{CanvasOAuthConfig, CanvasProvider};
pub use gradescope::GradescopeClient;
pub use prairielearn::PrairieLearnProvider;
pub use registry::{Registry, RegistryError};
pub use trait_::{
    CourseProvider, ProviderCredentials, ProviderError, RemoteCourse, RemoteItem,
};
