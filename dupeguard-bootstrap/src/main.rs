use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use dupeguard_infrastructure::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "dupeguard")]
#[command(about = "Item duplication exploit detection engine", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines event file to replay (.gz accepted)
    #[arg(short, long)]
    replay: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path).await?,
        None => AppConfig::load().await?,
    };
    let _log_guard = dupeguard_bootstrap::init_logging(&config.logging)?;
    info!("dupeguard v{} starting", env!("CARGO_PKG_VERSION"));

    dupeguard_bootstrap::run_standalone(config, args.replay).await
}
