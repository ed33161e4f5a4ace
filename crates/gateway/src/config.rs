//! Gateway configuration.

use common::{env_first, CacheConfig, RateLimitConfig};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Auth service gRPC endpoint
    pub auth_service_url: String,
    /// Parcel service gRPC endpoint (parcels and user administration)
    pub parcel_service_url: String,
    /// Redis for the profile cache and rate limiting
    pub cache: CacheConfig,
    /// General rate limit
    pub rate_limit: RateLimitConfig,
    /// Rate limit for `/auth/*`
    pub rate_limit_auth: RateLimitConfig,
    /// Rate limit for the public `/track/*` lookup
    pub rate_limit_track: RateLimitConfig,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            auth_service_url: env_first(&["AUTH_SERVICE_URL"]).unwrap_or(defaults.auth_service_url),
            parcel_service_url: env_first(&["PARCEL_SERVICE_URL"])
                .unwrap_or(defaults.parcel_service_url),
            cache: CacheConfig::from_env(),
            rate_limit: RateLimitConfig::from_env("RATE_LIMIT", defaults.rate_limit),
            rate_limit_auth: RateLimitConfig::from_env("RATE_LIMIT_AUTH", defaults.rate_limit_auth),
            rate_limit_track: RateLimitConfig::from_env(
                "RATE_LIMIT_TRACK",
                defaults.rate_limit_track,
            ),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            auth_service_url: "http://localhost:50051".to_string(),
            parcel_service_url: "http://localhost:50052".to_string(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            rate_limit_auth: RateLimitConfig {
                max_requests: 10,
                window_seconds: 60,
            },
            rate_limit_track: RateLimitConfig {
                max_requests: 30,
                window_seconds: 60,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_surfaces_are_stricter() {
        let config = GatewayConfig::default();
        assert!(config.rate_limit_auth.max_requests < config.rate_limit.max_requests);
        assert!(config.rate_limit_track.max_requests < config.rate_limit.max_requests);
    }
}
