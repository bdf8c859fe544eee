//! Sync run repository for database operations
//!
//! This module provides the SyncRunRepository struct which audits provider
//! sync executions. A run is inserted as `running` before the first provider
//! call and transitions exactly once to `completed` or `failed`.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::sync_run::{self, Entity as SyncRun};

/// Row counters accumulated over one provider sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounters {
    pub items_created: i32,
    pub items_updated: i32,
    pub courses_created: i32,
    pub courses_updated: i32,
}

/// Repository for sync run database operations
#[derive(Debug, Clone)]
pub struct SyncRunRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SyncRunRepository {
    /// Creates a new SyncRunRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a sync run by its ID within an owner scope
    pub async fn find_by_id(&self, owner_id: &Uuid, id: &Uuid) -> Result<Option<sync_run::Model>> {
        Ok(SyncRun::find_by_id(*id)
            .filter(sync_run::Column::OwnerId.eq(*owner_id))
            .one(&*self.db)
            .await?)
    }

    /// Inserts a new run in the `running` state
    pub async fn create_running(
        &self,
        owner_id: &Uuid,
        integration_id: &Uuid,
        provider: &str,
    ) -> Result<sync_run::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now().fixed_offset();

        let run = sync_run::ActiveModel {
            id: Set(id),
            owner_id: Set(*owner_id),
            integration_id: Set(*integration_id),
            provider: Set(provider.to_string()),
            status: Set("running".to_string()),
            started_at: Set(now),
            completed_at: Set(None),
            items_created: Set(0),
            items_updated: Set(0),
            courses_created: Set(0),
            courses_updated: Set(0),
            error_message: Set(None),
            created_at: Set(now),
        };

        run.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = SyncRun::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("sync run not persisted"))
    }

    /// Transitions a run to `completed`, recording the counters
    pub async fn mark_completed(
        &self,
        id: &Uuid,
        counters: &SyncCounters,
    ) -> Result<sync_run::Model> {
        let run = self.get_running(id).await?;

        let mut model: sync_run::ActiveModel = run.into();
        model.status = Set("completed".to_string());
        model.completed_at = Set(Some(Utc::now().fixed_offset()));
        model.items_created = Set(counters.items_created);
        model.items_updated = Set(counters.items_updated);
        model.courses_created = Set(counters.courses_created);
        model.courses_updated = Set(counters.courses_updated);

        Ok(model.update(&*self.db).await?)
    }

    /// Transitions a run to `failed`, recording the error message
    pub async fn mark_failed(&self, id: &Uuid, error_message: &str) -> Result<sync_run::Model> {
        let run = self.get_running(id).await?;

        let mut model: sync_run::ActiveModel = run.into();
        model.status = Set("failed".to_string());
        model.completed_at = Set(Some(Utc::now().fixed_offset()));
        model.error_message = Set(Some(error_message.to_string()));

        Ok(model.update(&*self.db).await?)
    }

    async fn get_running(&self, id: &Uuid) -> Result<sync_run::Model> {
        let run = SyncRun::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Sync run '{}' not found", id))?;

        // A run leaves `running` exactly once
        if run.status != "running" {
            return Err(anyhow!(
                "Sync run '{}' already finished with status '{}'",
                id,
                run.status
            ));
        }

        Ok(run)
    }
}
