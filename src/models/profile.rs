//! Profile entity model
//!
//! This module contains the SeaORM entity model for the profiles table.
//! The profile id is the owner id every other table is scoped by.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Profile entity representing one user of the dashboard
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Unique identifier for the user (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Display name
    pub full_name: Option<String>,

    /// Institutional email address
    pub school_email: Option<String>,

    /// IANA timezone used when rendering due dates
    pub timezone: String,

    /// Timestamp when the user finished onboarding
    pub onboarding_done_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the profile was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the profile was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
