//! gRPC implementation for AuthService.

use std::str::FromStr;
use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::service::{AuthService, Registration};
use common::AppError;
use domain::UserRole;
use proto::auth::{
    auth_service_server::AuthService as AuthServiceProto, LoginRequest, LoginResponse,
    RegisterRequest, RegisterResponse, VerifyTokenRequest, VerifyTokenResponse,
};

/// gRPC service wrapper for AuthService.
pub struct AuthGrpcService {
    service: Arc<dyn AuthService>,
}

impl AuthGrpcService {
    /// Create a new gRPC service wrapper.
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl AuthServiceProto for AuthGrpcService {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        let role = req
            .role
            .as_deref()
            .filter(|role| !role.trim().is_empty())
            .map(UserRole::from_str)
            .transpose()
            .map_err(|e| Status::from(AppError::from(e)))?;

        let user = self
            .service
            .register(Registration {
                email: req.email,
                password: req.password,
                name: req.name,
                role,
                phone: req.phone,
                address: req.address,
            })
            .await
            .map_err(Status::from)?;

        Ok(Response::new(RegisterResponse {
            id: user.id.to_string(),
            email: user.email,
            name: user.name,
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();

        let token = self
            .service
            .login(req.email, req.password)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(LoginResponse {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
        }))
    }

    async fn verify_token(
        &self,
        request: Request<VerifyTokenRequest>,
    ) -> Result<Response<VerifyTokenResponse>, Status> {
        let req = request.into_inner();

        match self.service.verify_token(&req.token) {
            Ok(claims) => Ok(Response::new(VerifyTokenResponse {
                user_id: claims.sub.to_string(),
                email: claims.email,
                role: claims.role.to_string(),
                valid: true,
            })),
            Err(_) => Ok(Response::new(VerifyTokenResponse {
                user_id: String::new(),
                email: String::new(),
                role: String::new(),
                valid: false,
            })),
        }
    }
}
