//! Test utilities for database testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations for testing purposes.

use anyhow::Result;
use edmap::config::AppConfig;
use edmap::crypto::CryptoKey;
use edmap::repositories::ProfileRepository;
use edmap::server::AppState;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::sync::Arc;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    // Create in-memory SQLite database
    let db = Database::connect("sqlite::memory:").await?;

    // Run all migrations
    Migrator::up(&db, None).await?;

    // SQLite does not enforce our Postgres foreign key semantics; disable FK
    // checks to allow inserting fixture data that may not satisfy
    // cross-table relations in tests.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(db)
}

/// Sets up an in-memory SQLite database and returns it behind an Arc.
#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Creates a profile row, generating an id when none is given.
#[allow(dead_code)]
pub async fn create_test_profile(
    db: &DatabaseConnection,
    profile_id: Option<Uuid>,
) -> Result<Uuid> {
    let id = profile_id.unwrap_or_else(Uuid::new_v4);
    ProfileRepository::new(Arc::new(db.clone()))
        .ensure_exists(&id)
        .await?;
    Ok(id)
}

/// Configuration used by router-level tests: one operator token, a fixed
/// test crypto key, defaults for everything else.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        operator_tokens: vec!["test-token".to_string()],
        crypto_key: Some(vec![0u8; 32]), // Test key
        ..Default::default()
    }
}

/// Builds application state over the given database.
#[allow(dead_code)]
pub fn test_state(config: AppConfig, db: DatabaseConnection) -> AppState {
    let crypto_key = CryptoKey::new(config.crypto_key.clone().unwrap_or_else(|| vec![0u8; 32]))
        .expect("Failed to create test crypto key");

    AppState {
        config: Arc::new(config),
        db,
        crypto_key,
    }
}

/// Builds the test crypto key used to store and read secrets in tests.
#[allow(dead_code)]
pub fn test_crypto_key() -> CryptoKey {
    CryptoKey::new(vec![0u8; 32]).expect("Failed to create test crypto key")
}
