//! Migration to create the sources table.
//!
//! A source is one connection of a course to a provider (canvas, gradescope,
//! prairielearn, prairietest, or manual for ICS imports).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sources::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sources::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(Sources::CourseId).uuid().not_null())
                    .col(ColumnDef::new(Sources::Provider).text().not_null())
                    .col(ColumnDef::new(Sources::DisplayName).text().null())
                    .col(ColumnDef::new(Sources::ExternalCourseId).text().null())
                    .col(
                        ColumnDef::new(Sources::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Sources::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Sources::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sources_owner_id")
                            .from(Sources::Table, Sources::OwnerId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sources_course_id")
                            .from(Sources::Table, Sources::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sources_owner_id")
                    .table(Sources::Table)
                    .col(Sources::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sources_course_id")
                    .table(Sources::Table)
                    .col(Sources::CourseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sources_course_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_sources_owner_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sources::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Sources {
    Table,
    Id,
    OwnerId,
    CourseId,
    Provider,
    DisplayName,
    ExternalCourseId,
    Status,
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
