//! Item repository for database operations
//!
//! This module provides the ItemRepository struct which encapsulates
//! SeaORM operations for the items table with owner-scoped methods and
//! the filtered listing used by the items endpoint.

use anyhow::{Result, anyhow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::item::{self, Entity as Item};

/// Optional equality filters for item listings
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub item_type: Option<String>,
    pub status: Option<String>,
    pub course_id: Option<Uuid>,
}

/// Repository for item database operations
#[derive(Debug, Clone)]
pub struct ItemRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ItemRepository {
    /// Creates a new ItemRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds an item by its ID within an owner scope
    pub async fn find_by_id(&self, owner_id: &Uuid, id: &Uuid) -> Result<Option<item::Model>> {
        Ok(Item::find_by_id(*id)
            .filter(item::Column::OwnerId.eq(*owner_id))
            .one(&*self.db)
            .await?)
    }

    /// Lists items for an owner, newest first, with optional filters
    pub async fn list_by_owner(
        &self,
        owner_id: &Uuid,
        filter: &ItemFilter,
    ) -> Result<Vec<item::Model>> {
        let mut query = Item::find().filter(item::Column::OwnerId.eq(*owner_id));

        if let Some(item_type) = &filter.item_type {
            query = query.filter(item::Column::ItemType.eq(item_type));
        }
        if let Some(status) = &filter.status {
            query = query.filter(item::Column::Status.eq(status));
        }
        if let Some(course_id) = &filter.course_id {
            query = query.filter(item::Column::CourseId.eq(*course_id));
        }

        Ok(query
            .order_by_desc(item::Column::CreatedAt)
            .order_by_desc(item::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Lists all items for an owner ordered by due date ascending, nulls last
    pub async fn find_by_owner_due_order(&self, owner_id: &Uuid) -> Result<Vec<item::Model>> {
        let mut items = Item::find()
            .filter(item::Column::OwnerId.eq(*owner_id))
            .order_by_asc(item::Column::CreatedAt)
            .order_by_asc(item::Column::Id)
            .all(&*self.db)
            .await?;

        // NULLS LAST differs between backends, so sort in memory
        items.sort_by(|a, b| match (&a.due_at, &b.due_at) {
            (Some(a_due), Some(b_due)) => a_due.cmp(b_due),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        Ok(items)
    }

    /// Finds an item by its `(external_id, owner_id)` sync dedup key
    pub async fn find_by_external_id(
        &self,
        owner_id: &Uuid,
        external_id: &str,
    ) -> Result<Option<item::Model>> {
        Ok(Item::find()
            .filter(item::Column::OwnerId.eq(*owner_id))
            .filter(item::Column::ExternalId.eq(external_id))
            .one(&*self.db)
            .await?)
    }

    /// Lists a course's items carrying the given external source tag.
    ///
    /// The ICS importer loads these once per import and matches
    /// `raw_ref.ics_uid` in memory, since JSON path filters are not portable
    /// across the Postgres and SQLite backends.
    pub async fn find_by_course_and_external_source(
        &self,
        owner_id: &Uuid,
        course_id: &Uuid,
        external_source: &str,
    ) -> Result<Vec<item::Model>> {
        Ok(Item::find()
            .filter(item::Column::OwnerId.eq(*owner_id))
            .filter(item::Column::CourseId.eq(*course_id))
            .filter(item::Column::ExternalSource.eq(external_source))
            .all(&*self.db)
            .await?)
    }

    /// Creates a new item record
    pub async fn create(&self, item: item::ActiveModel) -> Result<item::Model> {
        let id = item
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("item id must be set"))?;

        let active = item;
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Item::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("item not persisted"))
    }

    /// Updates mutable fields on an item within an owner scope
    pub async fn update_by_id(
        &self,
        owner_id: &Uuid,
        id: &Uuid,
        update: item::ActiveModel,
    ) -> Result<item::Model> {
        let existing = Item::find_by_id(*id)
            .filter(item::Column::OwnerId.eq(*owner_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Item with ID '{}' not found for owner", id))?;

        let mut model: item::ActiveModel = existing.into();

        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(item_type) = update.item_type.clone().take() {
            model.item_type = Set(item_type);
        }
        if let Some(status) = update.status.clone().take() {
            model.status = Set(status);
        }
        if let Some(due_at) = update.due_at.clone().take() {
            model.due_at = Set(due_at);
        }
        if let Some(points_possible) = update.points_possible.clone().take() {
            model.points_possible = Set(points_possible);
        }
        if let Some(external_url) = update.external_url.clone().take() {
            model.external_url = Set(external_url);
        }
        if let Some(raw_ref) = update.raw_ref.clone().take() {
            model.raw_ref = Set(raw_ref);
        }
        if let Some(metadata) = update.metadata.clone().take() {
            model.metadata = Set(metadata);
        }
        model.updated_at = Set(chrono::Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }
}
