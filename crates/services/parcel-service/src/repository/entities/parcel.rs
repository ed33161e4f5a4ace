//! Parcel database entity for SeaORM.

use sea_orm::entity::prelude::*;

use common::{AppError, AppResult};
use domain::{Parcel, ParcelDetails, StatusHistory};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "parcels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub tracking_id: String,
    pub sender_id: Uuid,
    pub receiver_email: String,
    pub address: String,
    pub phone: String,
    #[sea_orm(column_type = "Double")]
    pub weight: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub fee: f64,
    pub current_status: String,
    pub is_deleted: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id"
    )]
    Sender,
    #[sea_orm(has_many = "super::parcel_status::Entity")]
    StatusHistory,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl Related<super::parcel_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Assemble the domain parcel from this row and its history rows.
    pub fn into_parcel(self, history: StatusHistory) -> AppResult<Parcel> {
        let current_status = self.current_status.parse()?;
        if history.latest().status != current_status {
            return Err(AppError::internal(format!(
                "Parcel {} status {} disagrees with its history",
                self.id, current_status
            )));
        }

        Ok(Parcel {
            id: self.id,
            tracking_id: self.tracking_id,
            sender_id: self.sender_id,
            receiver_email: self.receiver_email,
            details: ParcelDetails {
                address: self.address,
                phone: self.phone,
                weight: self.weight,
                note: self.note,
            },
            fee: self.fee,
            current_status,
            status_history: history,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
