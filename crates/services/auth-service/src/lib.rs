//! Auth Service Library
//!
//! Registration, login and token verification over gRPC. Users live in the
//! identity store owned by parcel-service, reached through a gRPC client.

pub mod client;
pub mod config;
pub mod grpc;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tracing::info;

use crate::client::UserClient;
use crate::config::AuthServiceConfig;
use crate::grpc::AuthGrpcService;
use crate::service::Authenticator;

/// Run the auth service as an embedded component (for combined binary),
/// dialing parcel-service on the same host.
pub async fn run_embedded(
    host: &str,
    port: u16,
    parcel_port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AuthServiceConfig::from_env()?;
    let dial_host = match host {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    config.parcel_service_url = format!("http://{}:{}", dial_host, parcel_port);
    run_server_with_config(host, port, config).await
}

/// Run the gRPC server with the given configuration.
pub async fn run_server_with_config(
    host: &str,
    port: u16,
    config: AuthServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // Create gRPC client to the identity store
    let user_client = UserClient::connect(&config.parcel_service_url).await?;

    // Create auth service
    let auth_service = Arc::new(Authenticator::new(Arc::new(user_client), config.jwt));

    // Create gRPC service
    let grpc_service = AuthGrpcService::new(auth_service);

    // Build address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Auth service listening on {}", addr);

    // Run server
    Server::builder()
        .add_service(proto::AuthServiceServer::new(grpc_service))
        .serve(addr)
        .await?;

    Ok(())
}
