//! Integration entity model
//!
//! This module contains the SeaORM entity model for the integrations table,
//! the non-secret half of a user's credential record for one provider.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Integration entity representing one user's connection to a provider
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integrations")]
pub struct Model {
    /// Unique identifier for the integration (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Provider slug (canvas, gradescope, prairielearn)
    pub provider: String,

    /// Provider-side account identifier, when known
    pub external_id: Option<String>,

    /// Human-readable label shown on the connect page
    pub display_name: Option<String>,

    /// Whether the integration may be used for sync
    pub is_active: bool,

    /// Timestamp when the integration was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the integration was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::integration_secret::Entity")]
    IntegrationSecret,
    #[sea_orm(has_many = "super::sync_run::Entity")]
    SyncRun,
}

impl Related<super::integration_secret::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IntegrationSecret.def()
    }
}

impl Related<super::sync_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SyncRun.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
