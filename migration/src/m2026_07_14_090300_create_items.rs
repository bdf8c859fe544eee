//! Migration to create the items table.
//!
//! Items are the trackable units (assignments, quizzes, exams, calendar
//! events). Provider-specific fields and dedup keys live in the raw_ref and
//! metadata JSON columns; ICS imports store their calendar UID at
//! raw_ref.ics_uid.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Items::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Items::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Items::CourseId).uuid().null())
                    .col(ColumnDef::new(Items::SourceId).uuid().null())
                    .col(ColumnDef::new(Items::Title).text().not_null())
                    .col(ColumnDef::new(Items::Description).text().null())
                    .col(
                        ColumnDef::new(Items::ItemType)
                            .text()
                            .not_null()
                            .default("assignment"),
                    )
                    .col(
                        ColumnDef::new(Items::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Items::DueAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Items::PointsPossible).double().null())
                    .col(ColumnDef::new(Items::ExternalId).text().null())
                    .col(ColumnDef::new(Items::ExternalSource).text().null())
                    .col(ColumnDef::new(Items::ExternalUrl).text().null())
                    .col(ColumnDef::new(Items::RawRef).json_binary().null())
                    .col(ColumnDef::new(Items::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(Items::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Items::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_owner_id")
                            .from(Items::Table, Items::OwnerId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_course_id")
                            .from(Items::Table, Items::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_source_id")
                            .from(Items::Table, Items::SourceId)
                            .to(Sources::Table, Sources::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_items_owner_id")
                    .table(Items::Table)
                    .col(Items::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_items_course_id")
                    .table(Items::Table)
                    .col(Items::CourseId)
                    .to_owned(),
            )
            .await?;

        // Lookup index for provider upsert matching. Not unique: dedup is
        // decided by query-then-branch in the sync path.
        manager
            .create_index(
                Index::create()
                    .name("idx_items_owner_external")
                    .table(Items::Table)
                    .col(Items::OwnerId)
                    .col(Items::ExternalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_items_owner_external").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_items_course_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_items_owner_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Items {
    Table,
    Id,
    OwnerId,
    CourseId,
    SourceId,
    Title,
    Description,
    ItemType,
    Status,
    DueAt,
    PointsPossible,
    ExternalId,
    ExternalSource,
    ExternalUrl,
    RawRef,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Sources {
    Table,
    Id,
}
