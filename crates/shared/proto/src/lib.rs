//! gRPC protocol buffer definitions.
//!
//! This crate contains the generated gRPC service definitions for:
//! - AuthService: registration, login, token verification
//! - UserService: identity store (lookup, creation, account state)
//! - ParcelService: parcel lifecycle, listings and public tracking

/// Authentication service definitions.
pub mod auth {
    tonic::include_proto!("auth");
}

/// User service definitions.
pub mod user {
    tonic::include_proto!("user");
}

/// Parcel service definitions.
pub mod parcel {
    tonic::include_proto!("parcel");
}

// Re-export commonly used items
pub use auth::auth_service_client::AuthServiceClient;
pub use auth::auth_service_server::{AuthService, AuthServiceServer};
pub use parcel::parcel_service_client::ParcelServiceClient;
pub use parcel::parcel_service_server::{ParcelService, ParcelServiceServer};
pub use user::user_service_client::UserServiceClient;
pub use user::user_service_server::{UserService, UserServiceServer};
