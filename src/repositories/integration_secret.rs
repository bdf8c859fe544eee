//! Integration secret repository for database operations
//!
//! This module provides the IntegrationSecretRepository struct which stores
//! provider credentials encrypted at rest. Each `(integration, secret_type)`
//! pair holds at most one row, enforced by a unique index so concurrent
//! submissions resolve to an update instead of a duplicate.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::{CryptoKey, decrypt_secret, encrypt_secret};
use crate::error::is_unique_violation;
use crate::models::integration_secret::{self, Entity as IntegrationSecret};

/// Repository for integration secret database operations
#[derive(Debug, Clone)]
pub struct IntegrationSecretRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Crypto key for secret encryption
    pub crypto_key: CryptoKey,
}

impl IntegrationSecretRepository {
    /// Creates a new IntegrationSecretRepository instance
    pub fn new(db: Arc<DatabaseConnection>, crypto_key: CryptoKey) -> Self {
        Self { db, crypto_key }
    }

    /// Finds the secret row for an `(integration, secret_type)` pair
    pub async fn find_by_type(
        &self,
        integration_id: &Uuid,
        secret_type: &str,
    ) -> Result<Option<integration_secret::Model>> {
        Ok(IntegrationSecret::find()
            .filter(integration_secret::Column::IntegrationId.eq(*integration_id))
            .filter(integration_secret::Column::SecretType.eq(secret_type))
            .one(&*self.db)
            .await?)
    }

    /// Encrypts and stores a secret, replacing any existing value.
    pub async fn upsert_secret(
        &self,
        integration_id: &Uuid,
        secret_type: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<integration_secret::Model> {
        let ciphertext = encrypt_secret(&self.crypto_key, *integration_id, secret_type, value)
            .map_err(|e| anyhow!("Secret encryption failed: {}", e))?;
        let expires_fixed: Option<DateTimeWithTimeZone> = expires_at.map(Into::into);

        if let Some(existing) = self.find_by_type(integration_id, secret_type).await? {
            return self
                .overwrite(existing, ciphertext, expires_fixed)
                .await;
        }

        let id = Uuid::new_v4();
        let active = integration_secret::ActiveModel {
            id: Set(id),
            integration_id: Set(*integration_id),
            secret_type: Set(secret_type.to_string()),
            encrypted_value: Set(ciphertext.clone()),
            expires_at: Set(expires_fixed),
            ..Default::default()
        };

        match active.insert(&*self.db).await {
            Ok(_) => {}
            // Concurrent submission inserted first; the unique index turned
            // this into an update target
            Err(err) if is_unique_violation(&err) => {
                let existing = self
                    .find_by_type(integration_id, secret_type)
                    .await?
                    .ok_or_else(|| anyhow!("secret row vanished after unique violation"))?;
                return self.overwrite(existing, ciphertext, expires_fixed).await;
            }
            Err(err) => return Err(err.into()),
        }

        // For SQLite, query the record directly since we already know the ID
        let fetched = IntegrationSecret::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("integration secret not persisted"))
    }

    /// Returns the decrypted secret value for an `(integration, secret_type)`
    /// pair, or `None` when no row exists.
    pub async fn get_secret(
        &self,
        integration_id: &Uuid,
        secret_type: &str,
    ) -> Result<Option<String>> {
        let Some(row) = self.find_by_type(integration_id, secret_type).await? else {
            return Ok(None);
        };

        let value = decrypt_secret(
            &self.crypto_key,
            *integration_id,
            secret_type,
            &row.encrypted_value,
        )
        .map_err(|e| {
            tracing::error!(
                integration_id = %integration_id,
                secret_type = %secret_type,
                "Secret decryption failed"
            );
            anyhow!("Secret decryption failed: {}", e)
        })?;

        Ok(Some(value))
    }

    async fn overwrite(
        &self,
        existing: integration_secret::Model,
        ciphertext: Vec<u8>,
        expires_at: Option<DateTimeWithTimeZone>,
    ) -> Result<integration_secret::Model> {
        let mut model: integration_secret::ActiveModel = existing.into();
        model.encrypted_value = Set(ciphertext);
        model.expires_at = Set(expires_at);
        model.updated_at = Set(chrono::Utc::now().into());
        Ok(model.update(&*self.db).await?)
    }
}
