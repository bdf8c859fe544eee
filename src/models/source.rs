//! Source entity model
//!
//! This module contains the SeaORM entity model for the sources table,
//! one connection of a course to a provider.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Source entity linking a course to the provider it is fed from
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sources")]
pub struct Model {
    /// Unique identifier for the source (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Course this source feeds
    pub course_id: Uuid,

    /// Provider slug (canvas, gradescope, prairielearn, prairietest, manual)
    pub provider: String,

    /// Human-readable connection name
    pub display_name: Option<String>,

    /// Provider-side course identifier, or the import URL for ICS sources
    pub external_course_id: Option<String>,

    /// Connection status (active, inactive, error)
    pub status: String,

    /// Timestamp when the source was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the source was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(has_many = "super::item::Entity")]
    Item,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
