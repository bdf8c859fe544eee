//! IntegrationSecret entity model
//!
//! This module contains the SeaORM entity model for the integration_secrets
//! table. One row per (integration, secret_type); values are AES-256-GCM
//! ciphertexts and each secret is upserted independently of the others.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// IntegrationSecret entity holding one encrypted credential value
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integration_secrets")]
pub struct Model {
    /// Unique identifier for the secret row (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Integration this secret belongs to
    pub integration_id: Uuid,

    /// Which credential this row holds
    /// (access_token, refresh_token, canvas_url, prairielearn_url)
    pub secret_type: String,

    /// AES-256-GCM ciphertext: version byte, nonce, ciphertext+tag
    pub encrypted_value: Vec<u8>,

    /// Expiry of the underlying credential, when the provider reports one
    pub expires_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the secret was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the secret was last updated
    pub updated_at: DateTimeWithTimeZone,
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
