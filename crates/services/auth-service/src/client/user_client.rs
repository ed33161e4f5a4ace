//! gRPC client for the identity store served by parcel-service.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tonic::transport::Channel;
use tracing::debug;

use common::{AppError, AppResult};
use domain::{ActiveState, NewUser, User, UserRole};
use proto::user::{
    user_service_client::UserServiceClient as ProtoUserServiceClient, CreateUserRequest,
    GetUserByEmailRequest, InternalUserResponse, UserResponse,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Identity store operations needed by auth-service.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserServiceClient: Send + Sync {
    /// Find user by email including soft-deleted, password hash included
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>>;

    /// Create a new user; the password is already hashed
    async fn create(&self, user: NewUser) -> AppResult<User>;
}

/// gRPC client wrapper for the user service.
pub struct UserClient {
    client: ProtoUserServiceClient<Channel>,
}

impl UserClient {
    /// Connect to parcel-service.
    pub async fn connect(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        debug!("Connecting to user service at {}", endpoint);
        let client = ProtoUserServiceClient::connect(endpoint.to_string()).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UserServiceClient for UserClient {
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        let request = tonic::Request::new(GetUserByEmailRequest {
            email: email.to_string(),
        });

        let mut client = self.client.clone();
        // Internal endpoint: carries the password hash for authentication
        match client.get_user_by_email_internal(request).await {
            Ok(response) => Ok(Some(internal_proto_to_user(response.into_inner())?)),
            Err(status) if status.code() == tonic::Code::NotFound => Ok(None),
            Err(status) => Err(AppError::from(status)),
        }
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let request = tonic::Request::new(CreateUserRequest {
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role.to_string(),
            phone: user.phone,
            address: user.address,
        });

        let mut client = self.client.clone();
        let response = client.create_user(request).await.map_err(AppError::from)?;
        proto_to_user(response.into_inner())
    }
}

fn parse_timestamp(value: &str, field: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::internal(format!("Invalid {} from user service", field)))
}

fn parse_common(
    id: &str,
    role: &str,
    active_state: &str,
    deleted_at: Option<&str>,
) -> AppResult<(uuid::Uuid, UserRole, ActiveState, Option<DateTime<Utc>>)> {
    let id = id
        .parse()
        .map_err(|_| AppError::internal("Invalid UUID from user service"))?;
    let role = UserRole::from_str(role).map_err(|e| AppError::internal(e.to_string()))?;
    let active_state =
        ActiveState::from_str(active_state).map_err(|e| AppError::internal(e.to_string()))?;
    let deleted_at = deleted_at
        .map(|dt| parse_timestamp(dt, "deleted_at"))
        .transpose()?;
    Ok((id, role, active_state, deleted_at))
}

/// Convert proto InternalUserResponse to domain User (includes password hash).
fn internal_proto_to_user(proto: InternalUserResponse) -> AppResult<User> {
    let (id, role, active_state, deleted_at) = parse_common(
        &proto.id,
        &proto.role,
        &proto.active_state,
        proto.deleted_at.as_deref(),
    )?;

    Ok(User {
        id,
        email: proto.email,
        password_hash: proto.password_hash,
        name: proto.name,
        role,
        active_state,
        phone: None,
        address: None,
        created_at: parse_timestamp(&proto.created_at, "created_at")?,
        updated_at: parse_timestamp(&proto.updated_at, "updated_at")?,
        deleted_at,
    })
}

/// Convert the public proto UserResponse; the password hash is not carried.
fn proto_to_user(proto: UserResponse) -> AppResult<User> {
    let (id, role, active_state, deleted_at) = parse_common(
        &proto.id,
        &proto.role,
        &proto.active_state,
        proto.deleted_at.as_deref(),
    )?;

    Ok(User {
        id,
        email: proto.email,
        password_hash: String::new(),
        name: proto.name,
        role,
        active_state,
        phone: proto.phone,
        address: proto.address,
        created_at: parse_timestamp(&proto.created_at, "created_at")?,
        updated_at: parse_timestamp(&proto.updated_at, "updated_at")?,
        deleted_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_response_keeps_hash_and_state() {
        let user = internal_proto_to_user(InternalUserResponse {
            id: uuid::Uuid::new_v4().to_string(),
            email: "r@example.com".to_string(),
            name: "R".to_string(),
            role: "RECEIVER".to_string(),
            active_state: "BLOCKED".to_string(),
            password_hash: "$argon2id$...".to_string(),
            created_at: "2024-01-15T10:00:00+00:00".to_string(),
            updated_at: "2024-01-15T10:00:00+00:00".to_string(),
            deleted_at: None,
        })
        .unwrap();

        assert_eq!(user.role, UserRole::Receiver);
        assert!(user.is_blocked());
        assert_eq!(user.password_hash, "$argon2id$...");
    }

    #[test]
    fn malformed_timestamp_is_internal_error() {
        let result = proto_to_user(UserResponse {
            id: uuid::Uuid::new_v4().to_string(),
            email: "s@example.com".to_string(),
            name: "S".to_string(),
            role: "SENDER".to_string(),
            active_state: "ACTIVE".to_string(),
            phone: None,
            address: None,
            created_at: "yesterday".to_string(),
            updated_at: "2024-01-15T10:00:00+00:00".to_string(),
            deleted_at: None,
        });

        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
