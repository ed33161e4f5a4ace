//! API Gateway Library
//!
//! HTTP REST API for the parcel platform. Requests are authenticated through
//! auth-service and translated to gRPC calls on parcel-service.

pub mod clients;
pub mod config;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use crate::clients::{AuthClient, ParcelClient, UserClient};
use crate::config::GatewayConfig;
use crate::middleware::Cache;
use crate::routes::create_router;
use crate::state::AppState;

/// Run the gateway as an embedded component (for combined binary).
pub async fn run_embedded(
    host: &str,
    port: u16,
    auth_port: u16,
    parcel_port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = GatewayConfig::from_env();
    config.auth_service_url = format!("http://{}:{}", loopback(host), auth_port);
    config.parcel_service_url = format!("http://{}:{}", loopback(host), parcel_port);

    run_server_with_config(host, port, config).await
}

/// A wildcard bind address is not something to dial.
fn loopback(host: &str) -> &str {
    match host {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    }
}

/// Run the HTTP server against the service URLs in `config`.
pub async fn run_server_with_config(
    host: &str,
    port: u16,
    config: GatewayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // Create gRPC clients; user administration is served by parcel-service
    let auth_client = Arc::new(AuthClient::connect(&config.auth_service_url).await?);
    let user_client = Arc::new(UserClient::connect(&config.parcel_service_url).await?);
    let parcel_client = Arc::new(ParcelClient::connect(&config.parcel_service_url).await?);

    let cache = Arc::new(Cache::connect(&config.cache).await?);

    let state = AppState::new(auth_client, user_client, parcel_client, cache, config);

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Gateway listening on {}", addr);

    // Client addresses feed the rate limiter
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
