//! Parcel Service Library
//!
//! Owns the database: the identity store (users) and the parcel store, served
//! over gRPC as `UserService` and `ParcelService`. It can be run as a
//! standalone service or embedded in the combined binary.

pub mod config;
pub mod grpc;
pub mod infra;
pub mod repository;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tracing::info;

use crate::config::{AdminSeed, ParcelServiceConfig};
use crate::grpc::{ParcelGrpcService, UserGrpcService};
use crate::infra::{Database, Persistence, UnitOfWork};
use crate::service::{ParcelManager, UserManager, UserService};
use common::{AppError, AppResult};
use domain::{NewUser, Password, UserRole};

/// Run the parcel service as an embedded component (for combined binary).
pub async fn run_embedded(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = ParcelServiceConfig::from_env();
    run_server_with_config(host, port, config).await
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = ParcelServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Create the bootstrap admin unless an account with that email exists.
/// Returns whether an account was created.
pub async fn seed_admin(users: &dyn UserService, seed: &AdminSeed) -> AppResult<bool> {
    match users.get_user_by_email_with_deleted(&seed.email).await {
        Ok(_) => return Ok(false),
        Err(AppError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let password = Password::new(&seed.password)?;
    let admin = users
        .create_user(NewUser {
            email: seed.email.clone(),
            password_hash: password.into_string(),
            name: seed.name.clone(),
            role: UserRole::Admin,
            phone: None,
            address: None,
        })
        .await?;

    info!(user_id = %admin.id, email = %admin.email, "Admin account seeded");
    Ok(true)
}

/// Run the gRPC server with the given configuration.
async fn run_server_with_config(
    host: &str,
    port: u16,
    config: ParcelServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize database
    let db = Database::connect(&config.database).await?;
    let uow = Arc::new(Persistence::new(db.get_connection()));

    // Create services
    let user_service = Arc::new(UserManager::new(uow.users()));
    let parcel_service = Arc::new(ParcelManager::new(uow));

    if let Some(seed) = &config.admin {
        seed_admin(user_service.as_ref(), seed).await?;
    }

    // Create gRPC services
    let user_grpc = UserGrpcService::new(user_service);
    let parcel_grpc = ParcelGrpcService::new(parcel_service);

    // Build address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parcel service listening on {}", addr);

    // Run server
    Server::builder()
        .add_service(proto::UserServiceServer::new(user_grpc))
        .add_service(proto::ParcelServiceServer::new(parcel_grpc))
        .serve(addr)
        .await?;

    Ok(())
}
