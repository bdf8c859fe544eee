//! Database migrations for the EdMap API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_07_14_090000_create_profiles;
mod m2026_07_14_090100_create_courses;
mod m2026_07_14_090200_create_sources;
mod m2026_07_14_090300_create_items;
mod m2026_07_14_090400_create_integrations;
mod m2026_07_14_090500_create_integration_secrets;
mod m2026_07_14_090600_create_sync_runs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_07_14_090000_create_profiles::Migration),
            Box::new(m2026_07_14_090100_create_courses::Migration),
            Box::new(m2026_07_14_090200_create_sources::Migration),
            Box::new(m2026_07_14_090300_create_items::Migration),
            Box::new(m2026_07_14_090400_create_integrations::Migration),
            Box::new(m2026_07_14_090500_create_integration_secrets::Migration),
            Box::new(m2026_07_14_090600_create_sync_runs::Migration),
        ]
    }
}
