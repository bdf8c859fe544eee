//! Profile repository for database operations
//!
//! This module provides the ProfileRepository struct which encapsulates
//! SeaORM operations for the profiles table.

use anyhow::{Result, anyhow};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::profile::{self, Entity as Profile};

/// Repository for profile database operations
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ProfileRepository {
    /// Creates a new ProfileRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a profile by its ID
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<profile::Model>> {
        Ok(Profile::find_by_id(*id).one(&*self.db).await?)
    }

    /// Returns the profile for the given user, creating a bare row if absent.
    ///
    /// Sync and import paths call this before inserting owned rows so the
    /// foreign keys hold even for users that never completed onboarding.
    pub async fn ensure_exists(&self, user_id: &Uuid) -> Result<profile::Model> {
        if let Some(existing) = self.find_by_id(user_id).await? {
            return Ok(existing);
        }

        let active = profile::ActiveModel {
            id: Set(*user_id),
            ..Default::default()
        };

        match active.insert(&*self.db).await {
            Ok(_) => {}
            // Concurrent request created the row first; fall through to the fetch
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err.into()),
        }

        // For SQLite, query the record directly since we already know the ID
        let fetched = Profile::find_by_id(*user_id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("profile not persisted"))
    }
}
