//! Course entity model
//!
//! This module contains the SeaORM entity model for the courses table.
//! Rows pulled from a provider carry external_id + external_source for
//! upsert matching; manually created rows leave both null.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Course entity representing one course owned by a user
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    /// Unique identifier for the course (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Course title
    pub title: String,

    /// Short course code (e.g. CS 225)
    pub code: Option<String>,

    /// Academic term label
    pub term: Option<String>,

    /// Instructor name
    pub instructor: Option<String>,

    /// Display color for the dashboard
    pub color: Option<String>,

    /// Provider-side identifier used for upsert matching
    pub external_id: Option<String>,

    /// Which provider the row came from (canvas, prairielearn, ...)
    pub external_source: Option<String>,

    /// Link back to the course page on the provider
    pub external_url: Option<String>,

    /// Provider-specific fields that have no column of their own
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Option<JsonValue>,

    /// Timestamp when the course was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the course was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::source::Entity")]
    Source,
    #[sea_orm(has_many = "super::item::Entity")]
    Item,
}

impl Related<super::source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
