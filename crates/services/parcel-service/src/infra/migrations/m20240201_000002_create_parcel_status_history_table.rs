//! Migration: parcel status history, one row per recorded status.

use sea_orm_migration::prelude::*;

use super::m20240201_000001_create_parcels_table::Parcels;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ParcelStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ParcelStatusHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ParcelStatusHistory::ParcelId).uuid().not_null())
                    .col(ColumnDef::new(ParcelStatusHistory::Seq).integer().not_null())
                    .col(
                        ColumnDef::new(ParcelStatusHistory::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ParcelStatusHistory::UpdatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(ParcelStatusHistory::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parcel_status_history_parcel_id")
                            .from(ParcelStatusHistory::Table, ParcelStatusHistory::ParcelId)
                            .to(Parcels::Table, Parcels::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Two writers appending the same position collide here
        manager
            .create_index(
                Index::create()
                    .name("uq_parcel_status_history_parcel_seq")
                    .table(ParcelStatusHistory::Table)
                    .col(ParcelStatusHistory::ParcelId)
                    .col(ParcelStatusHistory::Seq)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ParcelStatusHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ParcelStatusHistory {
    Table,
    Id,
    ParcelId,
    Seq,
    Status,
    UpdatedBy,
    UpdatedAt,
}
