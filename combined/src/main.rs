//! Combined binary - runs the parcel platform in one process.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parcel_service_lib::MigrateAction;

/// Head start given to a service before its dependents dial it.
const STARTUP_DELAY: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "parcel-api")]
#[command(about = "Parcel tracking platform in a single process")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all services in a single process
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "GATEWAY_PORT", default_value = "3000")]
        gateway_port: u16,
        #[arg(long, env = "AUTH_SERVICE_PORT", default_value = "50051")]
        auth_port: u16,
        #[arg(long, env = "PARCEL_SERVICE_PORT", default_value = "50052")]
        parcel_port: u16,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateCommand,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum MigrateCommand {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

impl From<MigrateCommand> for MigrateAction {
    fn from(command: MigrateCommand) -> Self {
        match command {
            MigrateCommand::Up => MigrateAction::Up,
            MigrateCommand::Down => MigrateAction::Down,
            MigrateCommand::Status => MigrateAction::Status,
            MigrateCommand::Fresh => MigrateAction::Fresh,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            gateway_port,
            auth_port,
            parcel_port,
        } => {
            info!("Starting combined services");
            info!("  Gateway:        http://{}:{}", host, gateway_port);
            info!("  Auth service:   http://{}:{}", host, auth_port);
            info!("  Parcel service: http://{}:{}", host, parcel_port);

            // parcel-service owns the database and runs migrations on start
            let parcel_host = host.clone();
            let parcel_handle = tokio::spawn(async move {
                if let Err(e) = parcel_service_lib::run_embedded(&parcel_host, parcel_port).await {
                    error!("Parcel service failed: {}", e);
                }
            });

            tokio::time::sleep(STARTUP_DELAY).await;

            // auth-service dials parcel-service for the identity store
            let auth_host = host.clone();
            let auth_handle = tokio::spawn(async move {
                if let Err(e) =
                    auth_service_lib::run_embedded(&auth_host, auth_port, parcel_port).await
                {
                    error!("Auth service failed: {}", e);
                }
            });

            tokio::time::sleep(STARTUP_DELAY).await;

            let gateway_host = host.clone();
            let gateway_handle = tokio::spawn(async move {
                if let Err(e) =
                    gateway_lib::run_embedded(&gateway_host, gateway_port, auth_port, parcel_port)
                        .await
                {
                    error!("Gateway failed: {}", e);
                }
            });

            // Any service exiting takes the process down
            tokio::select! {
                _ = parcel_handle => {
                    error!("Parcel service exited unexpectedly");
                }
                _ = auth_handle => {
                    error!("Auth service exited unexpectedly");
                }
                _ = gateway_handle => {
                    error!("Gateway exited unexpectedly");
                }
            }
        }
        Commands::Migrate { action } => {
            parcel_service_lib::run_migrations(action.into()).await?;
        }
    }

    Ok(())
}
