//! Integration repository for database operations
//!
//! This module provides the IntegrationRepository struct which encapsulates
//! SeaORM operations for the integrations table. An integration is one
//! user's account-level connection to a provider.

use anyhow::{Result, anyhow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::integration::{self, Entity as Integration};

/// Repository for integration database operations
#[derive(Debug, Clone)]
pub struct IntegrationRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl IntegrationRepository {
    /// Creates a new IntegrationRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds an integration by its ID within an owner scope
    pub async fn find_by_id(
        &self,
        owner_id: &Uuid,
        id: &Uuid,
    ) -> Result<Option<integration::Model>> {
        Ok(Integration::find_by_id(*id)
            .filter(integration::Column::OwnerId.eq(*owner_id))
            .one(&*self.db)
            .await?)
    }

    /// Finds a user's integration for a provider
    pub async fn find_by_owner_and_provider(
        &self,
        owner_id: &Uuid,
        provider: &str,
    ) -> Result<Option<integration::Model>> {
        Ok(Integration::find()
            .filter(integration::Column::OwnerId.eq(*owner_id))
            .filter(integration::Column::Provider.eq(provider))
            .one(&*self.db)
            .await?)
    }

    /// Creates or refreshes a user's integration for a provider.
    ///
    /// Lookup decides insert vs. update; concurrent token submissions can
    /// race and both insert, which the lookup tolerates by returning the
    /// first row.
    pub async fn upsert(
        &self,
        owner_id: &Uuid,
        provider: &str,
        external_id: Option<String>,
        display_name: Option<String>,
    ) -> Result<integration::Model> {
        if let Some(existing) = self.find_by_owner_and_provider(owner_id, provider).await? {
            let mut model: integration::ActiveModel = existing.into();
            if external_id.is_some() {
                model.external_id = Set(external_id);
            }
            if display_name.is_some() {
                model.display_name = Set(display_name);
            }
            model.is_active = Set(true);
            model.updated_at = Set(chrono::Utc::now().into());
            return Ok(model.update(&*self.db).await?);
        }

        let id = Uuid::new_v4();
        let active = integration::ActiveModel {
            id: Set(id),
            owner_id: Set(*owner_id),
            provider: Set(provider.to_string()),
            external_id: Set(external_id),
            display_name: Set(display_name),
            is_active: Set(true),
            ..Default::default()
        };
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Integration::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("integration not persisted"))
    }
}
