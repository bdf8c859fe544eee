//! SyncRun entity model
//!
//! This module contains the SeaORM entity model for the sync_runs table,
//! the append-only audit of provider sync attempts. A run moves from
//! running to exactly one of completed or failed, and completed_at is
//! written once at that transition.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// SyncRun entity auditing one provider sync attempt
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_runs")]
pub struct Model {
    /// Unique identifier for the run (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Integration the run was executed for
    pub integration_id: Uuid,

    /// Provider slug, denormalized for listing without a join
    pub provider: String,

    /// Current status (running, completed, failed)
    pub status: String,

    /// Timestamp when the run started
    pub started_at: DateTimeWithTimeZone,

    /// Timestamp when the run finished, in either outcome
    pub completed_at: Option<DateTimeWithTimeZone>,

    /// Number of items inserted by this run
    pub items_created: i32,

    /// Number of items updated in place by this run
    pub items_updated: i32,

    /// Number of courses inserted by this run
    pub courses_created: i32,

    /// Number of courses updated in place by this run
    pub courses_updated: i32,

    /// Raw error message when the run failed
    pub error_message: Option<String>,

    /// Timestamp when the row was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::integration::Entity",
        from = "Column::IntegrationId",
        to = "super::integration::Column::Id"
    )]
    Integration,
}

impl Related<super::integration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Integration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
