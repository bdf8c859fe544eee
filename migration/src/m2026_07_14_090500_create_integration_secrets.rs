//! Migration to create the integration_secrets table.
//!
//! One row per (integration, secret_type). Values are AES-256-GCM
//! ciphertexts; the unique index is what makes independent per-secret
//! upserts safe.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IntegrationSecrets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IntegrationSecrets::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSecrets::IntegrationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSecrets::SecretType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSecrets::EncryptedValue)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSecrets::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSecrets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(IntegrationSecrets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_integration_secrets_integration_id")
                            .from(
                                IntegrationSecrets::Table,
                                IntegrationSecrets::IntegrationId,
                            )
                            .to(Integrations::Table, Integrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_integration_secrets_integration_type")
                    .table(IntegrationSecrets::Table)
                    .col(IntegrationSecrets::IntegrationId)
                    .col(IntegrationSecrets::SecretType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_integration_secrets_integration_type")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(IntegrationSecrets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IntegrationSecrets {
    Table,
    Id,
    IntegrationId,
    SecretType,
    EncryptedValue,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Integrations {
    Table,
    Id,
}
