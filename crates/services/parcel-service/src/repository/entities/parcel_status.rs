//! Parcel status history rows. Inserted only.

use sea_orm::entity::prelude::*;

use common::AppError;
use domain::StatusEntry;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "parcel_status_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parcel_id: Uuid,
    /// 0-based position in the parcel's history
    pub seq: i32,
    pub status: String,
    pub updated_by: Uuid,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parcel::Entity",
        from = "Column::ParcelId",
        to = "super::parcel::Column::Id"
    )]
    Parcel,
}

impl Related<super::parcel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parcel.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for StatusEntry {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(StatusEntry {
            status: model.status.parse()?,
            updated_at: model.updated_at,
            updated_by: model.updated_by,
        })
    }
}
