//! Migration to create the courses table.
//!
//! Courses are owner-scoped. Rows pulled from a provider carry an
//! external_id + external_source pair used for upsert matching; rows created
//! by hand (or by an ICS import) leave those null.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Courses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Courses::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Courses::Title).text().not_null())
                    .col(ColumnDef::new(Courses::Code).text().null())
                    .col(ColumnDef::new(Courses::Term).text().null())
                    .col(ColumnDef::new(Courses::Instructor).text().null())
                    .col(ColumnDef::new(Courses::Color).text().null())
                    .col(ColumnDef::new(Courses::ExternalId).text().null())
                    .col(ColumnDef::new(Courses::ExternalSource).text().null())
                    .col(ColumnDef::new(Courses::ExternalUrl).text().null())
                    .col(ColumnDef::new(Courses::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(Courses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Courses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_courses_owner_id")
                            .from(Courses::Table, Courses::OwnerId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_courses_owner_id")
                    .table(Courses::Table)
                    .col(Courses::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Lookup index for provider upsert matching. Deliberately not unique:
        // dedup is decided by query-then-branch in the sync path.
        manager
            .create_index(
                Index::create()
                    .name("idx_courses_owner_external")
                    .table(Courses::Table)
                    .col(Courses::OwnerId)
                    .col(Courses::ExternalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_courses_owner_external").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_courses_owner_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Courses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    OwnerId,
    Title,
    Code,
    Term,
    Instructor,
    Color,
    ExternalId,
    ExternalSource,
    ExternalUrl,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}
