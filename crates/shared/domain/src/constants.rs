//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Platform administrator
pub const ROLE_ADMIN: &str = "ADMIN";

/// Creates and pays for parcels
pub const ROLE_SENDER: &str = "SENDER";

/// Addressee of parcels, identified by email
pub const ROLE_RECEIVER: &str = "RECEIVER";

// =============================================================================
// Account States
// =============================================================================

pub const ACCOUNT_ACTIVE: &str = "ACTIVE";
pub const ACCOUNT_INACTIVE: &str = "INACTIVE";
pub const ACCOUNT_BLOCKED: &str = "BLOCKED";

// =============================================================================
// Parcels
// =============================================================================

/// Literal prefix of every tracking id (`TRK-YYYYMMDD-NNNNNN`)
pub const TRACKING_ID_PREFIX: &str = "TRK";

/// Inclusive bounds of the random tracking id suffix (always six digits)
pub const TRACKING_SUFFIX_MIN: u32 = 100_000;
pub const TRACKING_SUFFIX_MAX: u32 = 999_999;

// =============================================================================
// Pagination
// =============================================================================

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Default number of parcels per page
pub const DEFAULT_PAGE_SIZE: u64 = 8;

/// Maximum allowed items per page
pub const MAX_PAGE_SIZE: u64 = 100;

/// Highest page number whose offset still fits a signed 64-bit SQL OFFSET
pub const MAX_PAGE_NUMBER: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum name length requirement
pub const MIN_NAME_LENGTH: usize = 1;

// =============================================================================
// Authentication
// =============================================================================

/// Default JWT token expiration in hours
pub const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 24;

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Seconds per hour (for token expiration calculation)
pub const SECONDS_PER_HOUR: i64 = 3600;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";
