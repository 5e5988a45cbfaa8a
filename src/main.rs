use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use honeykyc::{api, config, utils};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a key=value configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    utils::logging::init_logger();

    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = config::load_config(cli.config.as_deref())?;

    info!("Starting identity verification service...");
    api::run(settings).await?;

    Ok(())
}
