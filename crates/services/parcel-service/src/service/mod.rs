//! Service layer - identity store and parcel lifecycle use cases.

mod parcel_service;
mod user_service;

pub use parcel_service::{ParcelManager, ParcelService};
pub use user_service::{UserManager, UserService};
