//! Auth service configuration.

use common::{env_first, AppResult, JwtConfig};
use domain::{DEFAULT_JWT_EXPIRATION_HOURS, MIN_JWT_SECRET_LENGTH};

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Token signing settings
    pub jwt: JwtConfig,
    /// Parcel service gRPC endpoint (owner of the identity store)
    pub parcel_service_url: String,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails when `JWT_SECRET` is missing or shorter than the minimum length.
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            jwt: JwtConfig::from_env(MIN_JWT_SECRET_LENGTH, DEFAULT_JWT_EXPIRATION_HOURS)?,
            parcel_service_url: env_first(&["PARCEL_SERVICE_URL", "AUTH_SERVICE_PARCEL_SERVICE_URL"])
                .unwrap_or_else(|| "http://localhost:50052".to_string()),
        })
    }
}
