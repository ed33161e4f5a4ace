//! gRPC clients for calling microservices.

mod auth_client;
mod parcel_client;
mod user_client;

pub use auth_client::{AuthClient, Claims, SignUp, TokenResponse};
pub use parcel_client::{ParcelClient, ParcelList, ParcelPage};
pub use user_client::UserClient;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::{AppError, AppResult};

/// A malformed id from a backing service is our bug, not the caller's.
fn parse_uuid(raw: &str, source: &str) -> AppResult<Uuid> {
    raw.parse()
        .map_err(|_| AppError::internal(format!("Invalid UUID from {}", source)))
}

fn parse_timestamp(raw: &str, source: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| AppError::internal(format!("Invalid timestamp from {}", source)))
}
