//! gRPC implementation for UserService.

use std::str::FromStr;
use std::sync::Arc;

use tonic::{Request, Response, Status};

use super::parse_uuid;
use crate::service::UserService;
use common::AppError;
use domain::{ActiveState, NewUser, UserRole};
use proto::user::{
    user_service_server::UserService as UserServiceProto, CreateUserRequest,
    GetUserByEmailRequest, GetUserRequest, InternalUserResponse, ListUsersRequest,
    ListUsersResponse, SetActiveStateRequest, UserResponse,
};

/// gRPC service wrapper for UserService.
pub struct UserGrpcService {
    service: Arc<dyn UserService>,
}

impl UserGrpcService {
    /// Create a new gRPC service wrapper.
    pub fn new(service: Arc<dyn UserService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl UserServiceProto for UserGrpcService {
    async fn get_user(
        &self,
        request: Request<GetUserRequest>,
    ) -> Result<Response<UserResponse>, Status> {
        let req = request.into_inner();
        let id = parse_uuid(&req.id)?;

        let user = self.service.get_user(id).await.map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn list_users(
        &self,
        _request: Request<ListUsersRequest>,
    ) -> Result<Response<ListUsersResponse>, Status> {
        let users = self.service.list_users().await.map_err(Status::from)?;
        let total = users.len() as i32;
        let users: Vec<UserResponse> = users.iter().map(user_to_proto).collect();

        Ok(Response::new(ListUsersResponse { users, total }))
    }

    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<UserResponse>, Status> {
        let req = request.into_inner();
        let role = UserRole::from_str(&req.role).map_err(|e| Status::from(AppError::from(e)))?;

        let user = self
            .service
            .create_user(NewUser {
                email: req.email,
                password_hash: req.password_hash,
                name: req.name,
                role,
                phone: req.phone,
                address: req.address,
            })
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn set_active_state(
        &self,
        request: Request<SetActiveStateRequest>,
    ) -> Result<Response<UserResponse>, Status> {
        let req = request.into_inner();
        let id = parse_uuid(&req.id)?;
        let state = ActiveState::from_str(&req.active_state)
            .map_err(|e| Status::from(AppError::from(e)))?;

        let user = self
            .service
            .set_active_state(id, state)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn get_user_by_email_internal(
        &self,
        request: Request<GetUserByEmailRequest>,
    ) -> Result<Response<InternalUserResponse>, Status> {
        let req = request.into_inner();

        let user = self
            .service
            .get_user_by_email_with_deleted(&req.email)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(internal_user_to_proto(&user)))
    }
}

/// Convert domain User to proto UserResponse (public - no password hash).
fn user_to_proto(user: &domain::User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role.to_string(),
        active_state: user.active_state.to_string(),
        phone: user.phone.clone(),
        address: user.address.clone(),
        created_at: user.created_at.to_rfc3339(),
        updated_at: user.updated_at.to_rfc3339(),
        deleted_at: user.deleted_at.map(|dt| dt.to_rfc3339()),
    }
}

/// Convert domain User to proto InternalUserResponse (includes password hash).
fn internal_user_to_proto(user: &domain::User) -> InternalUserResponse {
    InternalUserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role.to_string(),
        active_state: user.active_state.to_string(),
        password_hash: user.password_hash.clone(),
        created_at: user.created_at.to_rfc3339(),
        updated_at: user.updated_at.to_rfc3339(),
        deleted_at: user.deleted_at.map(|dt| dt.to_rfc3339()),
    }
}
