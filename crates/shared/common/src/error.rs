//! Unified error handling for HTTP and gRPC.
//!
//! Provides a single error type that can be converted to:
//! - Axum HTTP responses (for the gateway)
//! - Tonic gRPC statuses (for the services)
//!
//! The stable error code travels in the `x-app-error` metadata entry so the
//! receiving side of a gRPC hop rebuilds the same kind, not just the closest
//! gRPC code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;
use tonic::{metadata::MetadataValue, Status};

/// gRPC metadata key carrying [`AppError::code`].
pub const ERROR_CODE_METADATA: &str = "x-app-error";

/// Application error types with support for both HTTP and gRPC.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Resource errors
    #[error("{0}")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    /// The record's current state does not allow the operation
    #[error("{0}")]
    InvalidState(String),

    // Rate limiting
    #[error("Too many requests")]
    TooManyRequests,

    /// A transaction aborted on an infrastructure failure
    #[error("Transaction aborted: {0}")]
    DependencyFailure(String),

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "jwt")]
    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[cfg(feature = "cache")]
    #[error("Cache error")]
    Cache(#[from] redis::RedisError),

    // gRPC specific
    #[error("Service unavailable")]
    ServiceUnavailable(String),

    #[error("gRPC error: {0}")]
    Grpc(String),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::TooManyRequests => "TOO_MANY_REQUESTS",
            AppError::DependencyFailure(_) => "DEPENDENCY_FAILURE",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "AUTH_ERROR",
            #[cfg(feature = "cache")]
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Grpc(_) => "GRPC_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::DependencyFailure(_) => StatusCode::FAILED_DEPENDENCY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::InvalidState(msg) => msg.clone(),
            AppError::Conflict(msg) => {
                // Avoid duplicating "already exists" when converted from gRPC
                if msg.ends_with("already exists") {
                    msg.clone()
                } else {
                    format!("{} already exists", msg)
                }
            }
            AppError::DependencyFailure(cause) => {
                tracing::warn!("Transaction aborted: {}", cause);
                self.to_string()
            }

            // Hide details for internal/security errors
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            #[cfg(feature = "jwt")]
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "Invalid or expired token".to_string()
            }
            #[cfg(feature = "cache")]
            AppError::Cache(e) => {
                tracing::error!("Cache error: {:?}", e);
                "A cache error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            AppError::ServiceUnavailable(service) => {
                tracing::error!("Service unavailable: {}", service);
                format!("Service {} is unavailable", service)
            }
            AppError::Grpc(msg) => {
                tracing::error!("gRPC error: {}", msg);
                "A service communication error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }

    /// Failures of the storage or of a downstream service, as opposed to a
    /// rejection decided by business rules.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            #[cfg(feature = "database")]
            AppError::Database(_) => true,
            #[cfg(feature = "cache")]
            AppError::Cache(_) => true,
            AppError::Internal(_) | AppError::Grpc(_) | AppError::ServiceUnavailable(_) => true,
            _ => false,
        }
    }

    /// Error surfaced by an aborted transaction.
    ///
    /// Policy rejections keep their kind; infrastructure failures become
    /// [`AppError::DependencyFailure`] carrying the original message.
    pub fn into_transaction_failure(self) -> Self {
        match self {
            AppError::DependencyFailure(_) => self,
            #[cfg(feature = "database")]
            AppError::Database(e) => AppError::DependencyFailure(e.to_string()),
            AppError::Internal(msg) | AppError::Grpc(msg) | AppError::ServiceUnavailable(msg) => {
                AppError::DependencyFailure(msg)
            }
            other if other.is_infrastructure() => AppError::DependencyFailure(other.to_string()),
            other => other,
        }
    }

    /// Rebuild an error from its stable code and message.
    fn from_code(code: &str, message: String) -> Option<Self> {
        let err = match code {
            "UNAUTHORIZED" => AppError::Unauthorized,
            "FORBIDDEN" => AppError::Forbidden(message),
            "INVALID_CREDENTIALS" => AppError::InvalidCredentials,
            "NOT_FOUND" => AppError::NotFound(message),
            "CONFLICT" => AppError::Conflict(message),
            "VALIDATION_ERROR" => AppError::Validation(message),
            "BAD_REQUEST" => AppError::BadRequest(message),
            "INVALID_STATE" => AppError::InvalidState(message),
            "TOO_MANY_REQUESTS" => AppError::TooManyRequests,
            "DEPENDENCY_FAILURE" => AppError::DependencyFailure(
                message
                    .strip_prefix("Transaction aborted: ")
                    .map(str::to_string)
                    .unwrap_or(message),
            ),
            "SERVICE_UNAVAILABLE" => AppError::ServiceUnavailable(message),
            _ => return None,
        };
        Some(err)
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// gRPC Status (Tonic)
// =============================================================================

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        let code = match &err {
            AppError::Unauthorized | AppError::InvalidCredentials => tonic::Code::Unauthenticated,
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => tonic::Code::Unauthenticated,
            AppError::Forbidden(_) => tonic::Code::PermissionDenied,
            AppError::NotFound(_) => tonic::Code::NotFound,
            AppError::Conflict(_) => tonic::Code::AlreadyExists,
            AppError::Validation(_) | AppError::BadRequest(_) => tonic::Code::InvalidArgument,
            AppError::InvalidState(_) => tonic::Code::FailedPrecondition,
            AppError::TooManyRequests => tonic::Code::ResourceExhausted,
            AppError::DependencyFailure(_) => tonic::Code::Aborted,
            AppError::ServiceUnavailable(_) => tonic::Code::Unavailable,
            _ => tonic::Code::Internal,
        };

        let mut status = Status::new(code, err.user_message());
        status
            .metadata_mut()
            .insert(ERROR_CODE_METADATA, MetadataValue::from_static(err.code()));
        status
    }
}

impl From<Status> for AppError {
    fn from(status: Status) -> Self {
        let message = status.message().to_string();

        if let Some(err) = status
            .metadata()
            .get(ERROR_CODE_METADATA)
            .and_then(|value| value.to_str().ok())
            .and_then(|code| AppError::from_code(code, message.clone()))
        {
            return err;
        }

        match status.code() {
            tonic::Code::Unauthenticated => AppError::Unauthorized,
            tonic::Code::PermissionDenied => AppError::Forbidden(message),
            tonic::Code::NotFound => AppError::NotFound(message),
            tonic::Code::AlreadyExists => AppError::Conflict(message),
            tonic::Code::InvalidArgument => AppError::Validation(message),
            tonic::Code::FailedPrecondition => AppError::InvalidState(message),
            tonic::Code::ResourceExhausted => AppError::TooManyRequests,
            tonic::Code::Aborted => AppError::DependencyFailure(message),
            tonic::Code::Unavailable => AppError::ServiceUnavailable(message),
            _ => AppError::Grpc(message),
        }
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Password(msg) => AppError::Validation(msg),
            DomainError::NotFound(what) => AppError::not_found(what),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Unauthorized => AppError::Unauthorized,
            DomainError::Forbidden(msg) => AppError::Forbidden(msg),
            DomainError::InvalidState(msg) => AppError::InvalidState(msg),
            DomainError::BadRequest(msg) => AppError::BadRequest(msg),
            DomainError::InvalidCredentials => AppError::InvalidCredentials,
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    /// `what` names the missing record, e.g. `"Parcel"`.
    fn ok_or_not_found(self, what: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, what: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::not_found(what))
    }
}

/// Convenience constructors
impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(format!("{} not found", what.into()))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        AppError::InvalidState(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn grpc(msg: impl Into<String>) -> Self {
        AppError::Grpc(msg.into())
    }

    pub fn service_unavailable(service: impl Into<String>) -> Self {
        AppError::ServiceUnavailable(service.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn over_the_wire(err: AppError) -> AppError {
        AppError::from(Status::from(err))
    }

    #[test]
    fn lifecycle_kinds_map_to_http() {
        assert_eq!(AppError::not_found("Parcel").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::invalid_state("no").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::bad_request("no").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::DependencyFailure("boom".into()).status(),
            StatusCode::FAILED_DEPENDENCY
        );
    }

    #[test]
    fn kind_survives_a_grpc_hop() {
        let err = over_the_wire(AppError::invalid_state("Parcel has already been confirmed"));
        assert!(matches!(err, AppError::InvalidState(ref m) if m == "Parcel has already been confirmed"));

        let err = over_the_wire(AppError::bad_request("Receiver email is required"));
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = over_the_wire(AppError::not_found("Parcel"));
        assert_eq!(err.user_message(), "Parcel not found");

        let err = over_the_wire(AppError::DependencyFailure("connection reset".into()));
        assert!(matches!(err, AppError::DependencyFailure(ref m) if m == "connection reset"));
    }

    #[test]
    fn status_without_metadata_falls_back_to_grpc_code() {
        let err = AppError::from(Status::failed_precondition("stale"));
        assert!(matches!(err, AppError::InvalidState(_)));

        let err = AppError::from(Status::unavailable("down"));
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }

    #[test]
    fn transaction_failure_keeps_policy_rejections() {
        let err = AppError::invalid_state("Only pending parcels can be cancelled")
            .into_transaction_failure();
        assert!(matches!(err, AppError::InvalidState(_)));

        let err = AppError::internal("commit failed").into_transaction_failure();
        assert!(matches!(err, AppError::DependencyFailure(ref m) if m == "commit failed"));
    }

    #[test]
    fn domain_errors_keep_their_kind() {
        let err: AppError = DomainError::not_found("Receiver").into();
        assert_eq!(err.user_message(), "Receiver not found");

        let err: AppError = DomainError::forbidden("not yours").into();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn internal_details_are_hidden() {
        assert_eq!(
            AppError::internal("pool exhausted").user_message(),
            "An internal error occurred"
        );
    }
}
