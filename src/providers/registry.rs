//! Provider registry
//!
//! In-memory registry for storing and retrieving course providers by slug.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::config::AppConfig;
use crate::providers::{CanvasProvider, CourseProvider, PrairieLearnProvider};

/// Error type for registry operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Provider '{name}' not found")]
    ProviderNotFound { name: String },
}

/// Global provider registry instance
static REGISTRY: OnceLock<Arc<RwLock<Registry>>> = OnceLock::new();

/// Provider registry that stores course providers by slug
#[derive(Clone)]
pub struct Registry {
    providers: HashMap<String, Arc<dyn CourseProvider>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Get the global registry instance
    pub fn global() -> &'static Arc<RwLock<Registry>> {
        REGISTRY.get_or_init(|| Arc::new(RwLock::new(Self::new())))
    }

    /// Initialize the global registry with providers
    pub fn initialize(config: &AppConfig) {
        let registry = Self::global();
        let mut reg = registry.write().unwrap();

        reg.register(Arc::new(CanvasProvider::new(config.canvas_base_url.clone())));
        reg.register(Arc::new(PrairieLearnProvider::new(
            config.prairielearn_base_url.clone(),
        )));
    }

    /// Register a provider under its slug
    pub fn register(&mut self, provider: Arc<dyn CourseProvider>) {
        self.providers.insert(provider.slug().to_string(), provider);
    }

    /// Get a provider by slug
    pub fn get(&self, name: &str) -> Result<Arc<dyn CourseProvider>, RegistryError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ProviderNotFound {
                name: name.to_string(),
            })
    }

    /// List registered slugs, sorted for stable ordering
    pub fn list_slugs(&self) -> Vec<String> {
        let mut slugs: Vec<_> = self.providers.keys().cloned().collect();
        slugs.sort();
        slugs
    }

    /// Get a provider from the global registry (convenience for handlers)
    pub fn get_provider(name: &str) -> Result<Arc<dyn CourseProvider>, RegistryError> {
        let registry = Self::global();
        let reg = registry.read().unwrap();
        reg.get(name)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
