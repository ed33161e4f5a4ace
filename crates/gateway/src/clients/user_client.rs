//! gRPC client for the identity store in parcel-service.

use std::str::FromStr;

use tonic::transport::Channel;
use tracing::debug;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{ActiveState, UserResponse, UserRole};
use proto::user::{
    user_service_client::UserServiceClient as ProtoUserServiceClient, GetUserRequest,
    ListUsersRequest, SetActiveStateRequest,
};

use super::{parse_timestamp, parse_uuid};

/// gRPC client wrapper for user administration.
pub struct UserClient {
    client: ProtoUserServiceClient<Channel>,
}

impl UserClient {
    /// Connect to parcel-service.
    pub async fn connect(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        debug!("Connecting to user store at {}", endpoint);
        let client = ProtoUserServiceClient::connect(endpoint.to_string()).await?;
        Ok(Self { client })
    }

    /// Get user by ID.
    pub async fn get_user(&self, id: Uuid) -> AppResult<UserResponse> {
        let request = tonic::Request::new(GetUserRequest { id: id.to_string() });

        let mut client = self.client.clone();
        let response = client.get_user(request).await.map_err(AppError::from)?;
        proto_to_user(response.into_inner())
    }

    /// List all users.
    pub async fn list_users(&self) -> AppResult<Vec<UserResponse>> {
        let request = tonic::Request::new(ListUsersRequest {});

        let mut client = self.client.clone();
        let response = client.list_users(request).await.map_err(AppError::from)?;

        response
            .into_inner()
            .users
            .into_iter()
            .map(proto_to_user)
            .collect()
    }

    /// Activate, deactivate or block an account.
    pub async fn set_active_state(&self, id: Uuid, state: ActiveState) -> AppResult<UserResponse> {
        let request = tonic::Request::new(SetActiveStateRequest {
            id: id.to_string(),
            active_state: state.to_string(),
        });

        let mut client = self.client.clone();
        let response = client
            .set_active_state(request)
            .await
            .map_err(AppError::from)?;
        proto_to_user(response.into_inner())
    }
}

/// Convert proto UserResponse to the public profile.
fn proto_to_user(proto: proto::user::UserResponse) -> AppResult<UserResponse> {
    Ok(UserResponse {
        id: parse_uuid(&proto.id, "user store")?,
        email: proto.email,
        name: proto.name,
        role: UserRole::from_str(&proto.role)?,
        active_state: ActiveState::from_str(&proto.active_state)?,
        phone: proto.phone,
        address: proto.address,
        created_at: parse_timestamp(&proto.created_at, "user store")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proto_user() -> proto::user::UserResponse {
        proto::user::UserResponse {
            id: "0b8f3c55-98b1-4d67-a8b5-5b8c1f6f0a01".to_string(),
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            role: "ADMIN".to_string(),
            active_state: "BLOCKED".to_string(),
            phone: None,
            address: Some("1 Depot Rd".to_string()),
            created_at: "2026-01-05T08:30:00+00:00".to_string(),
            updated_at: "2026-01-05T08:30:00+00:00".to_string(),
            deleted_at: None,
        }
    }

    #[test]
    fn converts_profile_fields() {
        let user = proto_to_user(proto_user()).unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.active_state, ActiveState::Blocked);
        assert_eq!(user.address.as_deref(), Some("1 Depot Rd"));
    }

    #[test]
    fn malformed_id_is_internal() {
        let proto = proto::user::UserResponse {
            id: "nope".to_string(),
            ..proto_user()
        };
        assert!(matches!(proto_to_user(proto), Err(AppError::Internal(_))));
    }
}
