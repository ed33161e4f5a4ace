//! gRPC layer - transport wrappers around the services.

mod parcel_grpc;
mod user_grpc;

pub use parcel_grpc::ParcelGrpcService;
pub use user_grpc::UserGrpcService;

use std::str::FromStr;

use tonic::Status;
use uuid::Uuid;

use common::AppError;
use domain::{Caller, UserRole};

/// Parse UUID from string.
fn parse_uuid(s: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(s).map_err(|_| Status::invalid_argument("Invalid UUID format"))
}

/// Rebuild the caller from the id and role claimed by its token.
fn parse_caller(id: &str, role: &str) -> Result<Caller, Status> {
    let role = UserRole::from_str(role).map_err(|e| Status::from(AppError::from(e)))?;
    Ok(Caller::new(parse_uuid(id)?, role))
}
