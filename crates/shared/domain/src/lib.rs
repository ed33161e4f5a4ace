//! Domain layer - Core business entities and value objects.
//!
//! Pure parcel-tracking logic with no infrastructure dependencies: users and
//! roles, parcels and their status state machine, the access policy, and the
//! tracking id and fee helpers. Shared by every service.

pub mod constants;
pub mod error;
pub mod fee;
pub mod pagination;
pub mod parcel;
pub mod password;
pub mod policy;
pub mod status;
pub mod tracking;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use fee::calculate_fee;
pub use pagination::{Page, PageMeta, ParcelQuery};
pub use parcel::{
    check_weight, CreateParcel, Parcel, ParcelDetails, ParcelResponse, SenderContact,
    TrackedStatus, TrackingView, UpdateParcel,
};
pub use password::Password;
pub use policy::{authorize, is_permitted, Caller, Operation, ParcelScope};
pub use status::{ParcelStatus, StatusEntry, StatusHistory, Transition};
pub use tracking::{generate_tracking_id, is_valid_tracking_id};
pub use user::{ActiveState, NewUser, User, UserResponse, UserRole};
