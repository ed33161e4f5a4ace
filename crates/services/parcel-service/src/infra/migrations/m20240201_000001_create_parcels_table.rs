//! Migration: parcels table.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Parcels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Parcels::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Parcels::TrackingId)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Parcels::SenderId).uuid().not_null())
                    .col(ColumnDef::new(Parcels::ReceiverEmail).string().not_null())
                    .col(ColumnDef::new(Parcels::Address).string().not_null())
                    .col(ColumnDef::new(Parcels::Phone).string().not_null())
                    .col(ColumnDef::new(Parcels::Weight).double().not_null())
                    .col(ColumnDef::new(Parcels::Note).text().null())
                    .col(ColumnDef::new(Parcels::Fee).double().not_null())
                    .col(ColumnDef::new(Parcels::CurrentStatus).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Parcels::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Parcels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Parcels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parcels_sender_id")
                            .from(Parcels::Table, Parcels::SenderId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_parcels_sender_id", Parcels::SenderId),
            ("idx_parcels_receiver_email", Parcels::ReceiverEmail),
            ("idx_parcels_current_status", Parcels::CurrentStatus),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Parcels::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Parcels::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Parcels {
    Table,
    Id,
    TrackingId,
    SenderId,
    ReceiverEmail,
    Address,
    Phone,
    Weight,
    Note,
    Fee,
    CurrentStatus,
    IsDeleted,
    CreatedAt,
    UpdatedAt,
}
