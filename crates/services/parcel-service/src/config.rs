//! Parcel service configuration.

use std::env;
use std::fmt;

use common::DatabaseConfig;

/// Parcel service configuration.
#[derive(Clone)]
pub struct ParcelServiceConfig {
    /// Connection pool settings
    pub database: DatabaseConfig,
    /// Admin account created on start when both email and password are set
    pub admin: Option<AdminSeed>,
}

/// Bootstrap admin credentials.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl ParcelServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed {
                    email,
                    password,
                    name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
                })
            }
            _ => None,
        };

        Self {
            database: DatabaseConfig::from_env(&["PARCEL_SERVICE_DATABASE_URL", "DATABASE_URL"]),
            admin,
        }
    }
}

impl fmt::Debug for ParcelServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParcelServiceConfig")
            .field("database", &self.database)
            .field("admin", &self.admin.as_ref().map(|a| &a.email))
            .finish()
    }
}

impl Default for ParcelServiceConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            admin: None,
        }
    }
}
