//! Migration: sender to parcel links.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;
use super::m20240201_000001_create_parcels_table::Parcels;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserParcels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserParcels::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(UserParcels::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserParcels::ParcelId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserParcels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_parcels_user_id")
                            .from(UserParcels::Table, UserParcels::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_parcels_parcel_id")
                            .from(UserParcels::Table, UserParcels::ParcelId)
                            .to(Parcels::Table, Parcels::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_user_parcels_user_parcel")
                    .table(UserParcels::Table)
                    .col(UserParcels::UserId)
                    .col(UserParcels::ParcelId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserParcels::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserParcels {
    Table,
    Id,
    UserId,
    ParcelId,
    CreatedAt,
}
