//! Source repository for database operations
//!
//! This module provides the SourceRepository struct which encapsulates
//! SeaORM operations for the sources table. A source is one provider
//! connection scoped to a single course.

use anyhow::{Result, anyhow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::source::{self, Entity as Source};

/// Repository for source database operations
#[derive(Debug, Clone)]
pub struct SourceRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SourceRepository {
    /// Creates a new SourceRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists all sources for an owner ordered by creation time then ID
    pub async fn find_by_owner(&self, owner_id: &Uuid) -> Result<Vec<source::Model>> {
        Ok(Source::find()
            .filter(source::Column::OwnerId.eq(*owner_id))
            .order_by_asc(source::Column::CreatedAt)
            .order_by_asc(source::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Finds a source for a `(course, provider)` pair within an owner scope
    pub async fn find_by_course_and_provider(
        &self,
        owner_id: &Uuid,
        course_id: &Uuid,
        provider: &str,
    ) -> Result<Option<source::Model>> {
        Ok(Source::find()
            .filter(source::Column::OwnerId.eq(*owner_id))
            .filter(source::Column::CourseId.eq(*course_id))
            .filter(source::Column::Provider.eq(provider))
            .one(&*self.db)
            .await?)
    }

    /// Creates a new source record
    pub async fn create(&self, source: source::ActiveModel) -> Result<source::Model> {
        let id = source
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("source id must be set"))?;

        let active = source;
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Source::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("source not persisted"))
    }

    /// Updates mutable fields on a source within an owner scope
    pub async fn update_by_id(
        &self,
        owner_id: &Uuid,
        id: &Uuid,
        update: source::ActiveModel,
    ) -> Result<source::Model> {
        let existing = Source::find_by_id(*id)
            .filter(source::Column::OwnerId.eq(*owner_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Source with ID '{}' not found for owner", id))?;

        let mut model: source::ActiveModel = existing.into();

        if let Some(display_name) = update.display_name.clone().take() {
            model.display_name = Set(display_name);
        }
        if let Some(external_course_id) = update.external_course_id.clone().take() {
            model.external_course_id = Set(external_course_id);
        }
        if let Some(status) = update.status.clone().take() {
            model.status = Set(status);
        }
        model.updated_at = Set(chrono::Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }
}
