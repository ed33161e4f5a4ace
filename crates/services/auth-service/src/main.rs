//! Auth Service - gRPC server for authentication.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_service_lib::config::AuthServiceConfig;

#[derive(Parser)]
#[command(name = "auth-service")]
#[command(about = "Registration, login and token verification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gRPC server
    Serve {
        #[arg(long, env = "AUTH_SERVICE_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "AUTH_SERVICE_PORT", default_value = "50051")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            let config = AuthServiceConfig::from_env()?;
            auth_service_lib::run_server_with_config(&host, port, config).await?;
        }
    }

    Ok(())
}
