//! gRPC layer for auth-service.

mod auth_grpc;

pub use auth_grpc::AuthGrpcService;
