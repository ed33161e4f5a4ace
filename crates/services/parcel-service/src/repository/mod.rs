//! Repository layer for data access.

pub mod entities;
mod parcel_repository;
mod user_repository;

pub use parcel_repository::{ParcelRepository, ParcelStore, StatusFilter, TxParcelRepository};
pub use user_repository::{TxUserRepository, UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use parcel_repository::MockParcelRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
