use std::path::PathBuf;

use clap::Parser;
use oddsmith::app::Engine;
use oddsmith::config::Config;
use tokio::signal;
use tracing::info;

#[derive(Parser)]
#[command(name = "oddsmith", about = "Prediction ensemble and surebet scanner", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("{} not found, using defaults", cli.config.display());
        Config::default()
    };

    config.init_logging();
    info!("oddsmith starting");

    let engine = Engine::new(config)?;

    tokio::select! {
        _ = engine.run_scan_loop() => {}
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("oddsmith stopped");
    Ok(())
}
