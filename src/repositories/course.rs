//! Course repository for database operations
//!
//! This module provides the CourseRepository struct which encapsulates
//! SeaORM operations for the courses table with owner-scoped methods.

use anyhow::{Result, anyhow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::course::{self, Entity as Course};

/// Repository for course database operations
#[derive(Debug, Clone)]
pub struct CourseRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl CourseRepository {
    /// Creates a new CourseRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a course by its ID within an owner scope
    pub async fn find_by_id(&self, owner_id: &Uuid, id: &Uuid) -> Result<Option<course::Model>> {
        Ok(Course::find_by_id(*id)
            .filter(course::Column::OwnerId.eq(*owner_id))
            .one(&*self.db)
            .await?)
    }

    /// Lists all courses for an owner ordered by creation time then ID
    pub async fn find_by_owner(&self, owner_id: &Uuid) -> Result<Vec<course::Model>> {
        Ok(Course::find()
            .filter(course::Column::OwnerId.eq(*owner_id))
            .order_by_asc(course::Column::CreatedAt)
            .order_by_asc(course::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Finds a course by title and code within an owner scope.
    ///
    /// The ICS importer reuses the synthetic import course across repeated
    /// imports of the same calendar name, so UID dedup can see prior rows.
    pub async fn find_by_title_and_code(
        &self,
        owner_id: &Uuid,
        title: &str,
        code: &str,
    ) -> Result<Option<course::Model>> {
        Ok(Course::find()
            .filter(course::Column::OwnerId.eq(*owner_id))
            .filter(course::Column::Title.eq(title))
            .filter(course::Column::Code.eq(code))
            .one(&*self.db)
            .await?)
    }

    /// Finds a course by its `(external_id, owner_id)` sync dedup key
    pub async fn find_by_external_id(
        &self,
        owner_id: &Uuid,
        external_id: &str,
    ) -> Result<Option<course::Model>> {
        Ok(Course::find()
            .filter(course::Column::OwnerId.eq(*owner_id))
            .filter(course::Column::ExternalId.eq(external_id))
            .one(&*self.db)
            .await?)
    }

    /// Creates a new course record
    pub async fn create(&self, course: course::ActiveModel) -> Result<course::Model> {
        let id = course
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("course id must be set"))?;

        let active = course;
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Course::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("course not persisted"))
    }

    /// Updates mutable fields on a course within an owner scope
    pub async fn update_by_id(
        &self,
        owner_id: &Uuid,
        id: &Uuid,
        update: course::ActiveModel,
    ) -> Result<course::Model> {
        let existing = Course::find_by_id(*id)
            .filter(course::Column::OwnerId.eq(*owner_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Course with ID '{}' not found for owner", id))?;

        let mut model: course::ActiveModel = existing.into();

        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(code) = update.code.clone().take() {
            model.code = Set(code);
        }
        if let Some(term) = update.term.clone().take() {
            model.term = Set(term);
        }
        if let Some(instructor) = update.instructor.clone().take() {
            model.instructor = Set(instructor);
        }
        if let Some(color) = update.color.clone().take() {
            model.color = Set(color);
        }
        if let Some(external_url) = update.external_url.clone().take() {
            model.external_url = Set(external_url);
        }
        if let Some(metadata) = update.metadata.clone().take() {
            model.metadata = Set(metadata);
        }
        model.updated_at = Set(chrono::Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }
}
