use api_client::{ApiClient, BinanceClient};
use clap::{Parser, Subcommand};
use configuration::{ServerOverrides, Settings};
use relay::Relay;
use std::path::PathBuf;
use std::sync::Arc;

/// The main entry point for the Hookline webhook relay.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; everything it could set has a default.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    match cli.command {
        Commands::Serve(args) => handle_serve(args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Receives trading-alert webhooks and streams them live to connected dashboards.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server.
    Serve(ServeArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Path to a TOML configuration file (defaults to ./config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    server: ServerOverrides,
}

// ==============================================================================
// Serve Command Logic
// ==============================================================================

async fn handle_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut settings = configuration::load_config(args.config.as_deref())?;
    settings.apply_overrides(&args.server);

    let _log_guard = configuration::init_tracing(&settings.logging)?;
    tracing::info!(
        capacity = settings.store.capacity,
        subscriber_buffer = settings.hub.subscriber_buffer,
        "Starting Hookline webhook server."
    );

    let relay = Arc::new(Relay::new(
        settings.store.capacity,
        settings.hub.subscriber_buffer,
    ));
    let exchange = build_exchange_client(&settings);

    web_server::run_server(&settings.server, relay, exchange).await
}

/// The exchange proxy is optional; missing credentials only disable its routes.
fn build_exchange_client(settings: &Settings) -> Option<Arc<dyn ApiClient>> {
    if !settings.exchange.is_configured() {
        tracing::info!("No exchange API credentials found - /binance routes will be unavailable.");
        return None;
    }
    match BinanceClient::new(&settings.exchange) {
        Ok(client) => {
            tracing::info!(base_url = %settings.exchange.base_url, "Exchange proxy enabled.");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build the exchange client. Proxy disabled.");
            None
        }
    }
}
