//! gRPC client for auth-service.

use std::str::FromStr;

use tonic::transport::Channel;
use tracing::debug;

use common::{AppError, AppResult};
use domain::{ActiveState, UserResponse, UserRole};
use proto::auth::{
    auth_service_client::AuthServiceClient as ProtoAuthServiceClient, LoginRequest,
    RegisterRequest, RegisterResponse, VerifyTokenRequest, VerifyTokenResponse,
};

use super::{parse_timestamp, parse_uuid};

/// Token response from auth-service.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Verified token claims.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub user_id: uuid::Uuid,
    pub email: String,
    pub role: UserRole,
}

/// Fields of a self-registration.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<UserRole>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// gRPC client wrapper for auth-service.
pub struct AuthClient {
    client: ProtoAuthServiceClient<Channel>,
}

impl AuthClient {
    /// Connect to auth-service.
    pub async fn connect(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        debug!("Connecting to auth-service at {}", endpoint);
        let client = ProtoAuthServiceClient::connect(endpoint.to_string()).await?;
        Ok(Self { client })
    }

    /// Register a new sender or receiver.
    pub async fn register(&self, sign_up: SignUp) -> AppResult<UserResponse> {
        let request = tonic::Request::new(RegisterRequest {
            email: sign_up.email,
            password: sign_up.password,
            name: sign_up.name,
            role: sign_up.role.map(|role| role.to_string()),
            phone: sign_up.phone.clone(),
            address: sign_up.address.clone(),
        });

        let mut client = self.client.clone();
        let response = client.register(request).await.map_err(AppError::from)?;
        registered_user(response.into_inner(), sign_up.phone, sign_up.address)
    }

    /// Login and get token.
    pub async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let request = tonic::Request::new(LoginRequest { email, password });

        let mut client = self.client.clone();
        let response = client.login(request).await.map_err(AppError::from)?;
        let proto = response.into_inner();

        Ok(TokenResponse {
            access_token: proto.access_token,
            token_type: proto.token_type,
            expires_in: proto.expires_in,
        })
    }

    /// Verify a JWT token. `None` when the token is rejected.
    pub async fn verify_token(&self, token: &str) -> AppResult<Option<Claims>> {
        let request = tonic::Request::new(VerifyTokenRequest {
            token: token.to_string(),
        });

        let mut client = self.client.clone();
        let response = client.verify_token(request).await.map_err(AppError::from)?;
        claims_from_proto(response.into_inner())
    }
}

/// The register RPC echoes the identity fields only; a fresh account is active.
fn registered_user(
    proto: RegisterResponse,
    phone: Option<String>,
    address: Option<String>,
) -> AppResult<UserResponse> {
    Ok(UserResponse {
        id: parse_uuid(&proto.id, "auth-service")?,
        email: proto.email,
        name: proto.name,
        role: UserRole::from_str(&proto.role)?,
        active_state: ActiveState::Active,
        phone,
        address,
        created_at: parse_timestamp(&proto.created_at, "auth-service")?,
    })
}

fn claims_from_proto(proto: VerifyTokenResponse) -> AppResult<Option<Claims>> {
    if !proto.valid {
        return Ok(None);
    }

    Ok(Some(Claims {
        user_id: parse_uuid(&proto.user_id, "auth-service")?,
        email: proto.email,
        role: UserRole::from_str(&proto.role)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified(role: &str) -> VerifyTokenResponse {
        VerifyTokenResponse {
            user_id: "7a0c1b7e-4f43-4c34-9a4a-0d6f7a0d2c11".to_string(),
            email: "sender@example.com".to_string(),
            role: role.to_string(),
            valid: true,
        }
    }

    #[test]
    fn invalid_token_has_no_claims() {
        let proto = VerifyTokenResponse {
            valid: false,
            ..verified("")
        };
        assert_eq!(claims_from_proto(proto).unwrap(), None);
    }

    #[test]
    fn claims_carry_typed_role() {
        let claims = claims_from_proto(verified("RECEIVER")).unwrap().unwrap();
        assert_eq!(claims.role, UserRole::Receiver);
        assert_eq!(claims.email, "sender@example.com");
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(claims_from_proto(verified("COURIER")).is_err());
    }

    #[test]
    fn registration_echo_becomes_active_profile() {
        let proto = RegisterResponse {
            id: "7a0c1b7e-4f43-4c34-9a4a-0d6f7a0d2c11".to_string(),
            email: "r@example.com".to_string(),
            name: "Rae".to_string(),
            role: "RECEIVER".to_string(),
            created_at: "2026-03-01T10:00:00+00:00".to_string(),
        };
        let user = registered_user(proto, Some("555".to_string()), None).unwrap();
        assert_eq!(user.role, UserRole::Receiver);
        assert_eq!(user.active_state, ActiveState::Active);
        assert_eq!(user.phone.as_deref(), Some("555"));
    }
}
