//! spreadwatch - Entry Point
//!
//! Terminal dashboard: live price spreads plus admin list views.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Cross-exchange price spread dashboard
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SPREADWATCH_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    spreadwatch_telemetry::init_logging()?;

    info!("Starting spreadwatch v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > SPREADWATCH_CONFIG > default
    let config_path = args
        .config
        .or_else(|| std::env::var("SPREADWATCH_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = spreadwatch_app::AppConfig::load(&config_path)?;
    info!(
        api = %config.api.base_url,
        dashboard = config.dashboard.enabled,
        tables = config.tables.len(),
        "Configuration loaded"
    );

    let app = spreadwatch_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
