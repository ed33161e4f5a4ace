//! Redis cache for user profiles and rate limiting.

use redis::{aio::ConnectionManager, AsyncCommands, RedisError};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use common::{AppError, AppResult, CacheConfig};
use domain::UserResponse;

/// Cache key prefix for user profiles
const CACHE_PREFIX_PROFILE: &str = "profile:";

/// Cache key prefix for rate limiting
const CACHE_PREFIX_RATE_LIMIT: &str = "rate_limit:";

/// Redis cache wrapper.
pub struct Cache {
    conn: ConnectionManager,
    default_ttl_seconds: u64,
}

/// Outcome of one rate-limit hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHit {
    pub count: u64,
    pub allowed: bool,
}

fn cache_error(key: &str, op: &str, e: RedisError) -> AppError {
    warn!("Redis {} error for key {}: {}", op, key, e);
    AppError::Cache(e)
}

fn profile_key(id: &Uuid) -> String {
    format!("{}{}", CACHE_PREFIX_PROFILE, id)
}

fn rate_limit_key(identifier: &str) -> String {
    format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier)
}

impl Cache {
    /// Connect to Redis.
    pub async fn connect(config: &CacheConfig) -> Result<Self, RedisError> {
        debug!("Connecting to Redis at {}", config.url);
        let client = redis::Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            default_ttl_seconds: config.default_ttl_seconds,
        })
    }

    // =========================================================================
    // Generic Cache Operations
    // =========================================================================

    /// Get a value from cache. Undecodable entries count as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let result: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| cache_error(key, "get", e))?;

        Ok(result.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to deserialize cached value for key {}: {}", key, e);
                None
            }
        }))
    }

    /// Set a value in cache with the configured TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        self.set_with_ttl(key, value, self.default_ttl_seconds).await
    }

    /// Set a value in cache with custom TTL.
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Serialization error: {}", e)))?;
        conn.set_ex::<_, _, ()>(key, json, ttl_seconds)
            .await
            .map_err(|e| cache_error(key, "set", e))
    }

    /// Delete a value from cache.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| cache_error(key, "delete", e))
    }

    /// Round-trip to Redis.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("PING", "ping", e))?;
        Ok(())
    }

    // =========================================================================
    // Profile Cache Operations
    // =========================================================================

    /// Get a cached profile by user id.
    pub async fn get_profile(&self, id: &Uuid) -> AppResult<Option<UserResponse>> {
        self.get(&profile_key(id)).await
    }

    /// Cache a profile.
    pub async fn set_profile(&self, user: &UserResponse) -> AppResult<()> {
        self.set(&profile_key(&user.id), user).await
    }

    /// Drop a cached profile, e.g. after its account state changed.
    pub async fn invalidate_profile(&self, id: &Uuid) -> AppResult<()> {
        self.delete(&profile_key(id)).await
    }

    // =========================================================================
    // Rate Limiting
    // =========================================================================

    /// Count one request in a fixed window.
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<RateLimitHit> {
        let key = rate_limit_key(identifier);
        let mut conn = self.conn.clone();

        let count: u64 = conn
            .incr(&key, 1u64)
            .await
            .map_err(|e| cache_error(&key, "incr", e))?;

        // The first hit opens the window
        if count == 1 {
            conn.expire::<_, ()>(&key, window_seconds as i64)
                .await
                .map_err(|e| cache_error(&key, "expire", e))?;
        }

        Ok(RateLimitHit {
            count,
            allowed: count <= max_requests,
        })
    }

    /// Seconds left in the current window, if one is open.
    pub async fn get_rate_limit_ttl(&self, identifier: &str) -> AppResult<Option<u64>> {
        let key = rate_limit_key(identifier);
        let mut conn = self.conn.clone();
        let ttl: i64 = conn
            .ttl(&key)
            .await
            .map_err(|e| cache_error(&key, "ttl", e))?;
        Ok(u64::try_from(ttl).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(
            profile_key(&id),
            "profile:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(rate_limit_key("/auth/login:10.0.0.1"), "rate_limit:/auth/login:10.0.0.1");
    }
}
