//! CLI entry point: wires environment configuration into the composition
//! root and runs the HTTP server.

use autopilot_http::{AppConfig, AppState};
use autopilot_store::Store;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autopilot")]
#[command(about = "Incident triage autopilot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default if no subcommand is given).
    Serve,
    /// Apply pending store migrations and exit.
    Migrate,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => {
            Store::connect(&config.store_path).await?;
            tracing::info!("store migrations applied");
        }
        Commands::Serve => {
            let store = Store::connect(&config.store_path).await?;
            let state = AppState::new(config.clone(), store);
            autopilot_http::serve(config, state).await?;
        }
    }

    Ok(())
}
