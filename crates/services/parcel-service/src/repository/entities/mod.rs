//! SeaORM entities.

pub mod parcel;
pub mod parcel_status;
pub mod user;
pub mod user_parcel;
