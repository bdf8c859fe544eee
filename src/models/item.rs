//! Item entity model
//!
//! This module contains the SeaORM entity model for the items table, the
//! trackable academic units (assignments, quizzes, exams, calendar events).
//! Provider payload fields and dedup keys live in raw_ref/metadata; ICS
//! imports keep their calendar UID at raw_ref.ics_uid.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Item entity representing one gradable or trackable unit
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Course the item belongs to, if any
    pub course_id: Option<Uuid>,

    /// Source the item was imported through, if any
    pub source_id: Option<Uuid>,

    /// Item title
    pub title: String,

    /// Free-form description
    pub description: Option<String>,

    /// Kind of item (assignment, quiz, exam, project, reading, discussion, event)
    pub item_type: String,

    /// Status derived from due_at at write time
    /// (overdue/pending/no_due_date for synced and manual items,
    /// missed/upcoming/no_due_date for ICS imports)
    pub status: String,

    /// When the item is due
    pub due_at: Option<DateTimeWithTimeZone>,

    /// Maximum points, when the provider reports one
    pub points_possible: Option<f64>,

    /// Provider-side identifier used for upsert matching
    pub external_id: Option<String>,

    /// Where the row came from (canvas, prairielearn, ics, manual)
    pub external_source: Option<String>,

    /// Link back to the item on the provider
    pub external_url: Option<String>,

    /// Raw provider reference fields, including the ICS dedup UID
    #[sea_orm(column_type = "JsonBinary")]
    pub raw_ref: Option<JsonValue>,

    /// Provider-specific fields that have no column of their own
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Option<JsonValue>,

    /// Timestamp when the item was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the item was last updated
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
    #[sea_orm(
        belongs_to = "super::source::Entity",
        from = "Column::SourceId",
        to = "super::source::Column::Id"
    )]
    Source,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
