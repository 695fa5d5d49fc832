//! # Cardboard - scrollable tiling window manager
//!
//! Starts the window manager core on the headless backend, binds the command
//! socket and runs the user's config script, which is expected to set up key
//! bindings through `cutter`.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;

use cardboard::backend::HeadlessBackend;
use cardboard::config::{self, CardboardConfig};
use cardboard::Server;

#[derive(Parser)]
#[command(name = "cardboard")]
#[command(about = "A scrollable tiling window manager")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the command socket path
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Headless output sizes, e.g. `1920x1080`; repeat for more outputs
    #[arg(long = "output", value_parser = parse_size, default_value = "1920x1080")]
    outputs: Vec<(i32, i32)>,

    /// Don't run the config script
    #[arg(long)]
    no_script: bool,
}

fn parse_size(text: &str) -> Result<(i32, i32), String> {
    let (w, h) = text
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{text}'"))?;
    let w = w.parse().map_err(|_| format!("invalid width '{w}'"))?;
    let h = h.parse().map_err(|_| format!("invalid height '{h}'"))?;
    Ok((w, h))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("🚀 Starting cardboard");
    info!(
        "📄 Version: {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("CARDBOARD_GIT_COMMIT").unwrap_or("unknown commit"),
        env!("CARDBOARD_BUILD_DATE")
    );

    // Load configuration
    let config_path = match cli.config {
        Some(path) => Some(path),
        None => config::default_config_path().ok(),
    };
    let config = match config_path.as_deref().map(CardboardConfig::load) {
        Some(Ok(config)) => {
            info!("✅ Configuration loaded");
            config
        }
        Some(Err(e)) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            CardboardConfig::default()
        }
        None => {
            info!("📝 Using default configuration");
            CardboardConfig::default()
        }
    };

    let socket = cli.socket.unwrap_or_else(|| config.ipc_socket_path());
    let script = if cli.no_script {
        None
    } else {
        match config::config_script_path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("⚠️ No config script: {:#}", e);
                None
            }
        }
    };

    let backend = cli
        .outputs
        .iter()
        .fold(HeadlessBackend::new(), |backend, &(w, h)| backend.with_output(w, h));

    let mut server = Server::new(config, Box::new(backend)).context("Failed to create server")?;
    let code = server.run(&socket, script.as_deref()).await?;

    info!("✅ Cardboard shutdown complete");
    drop(server);
    std::process::exit(code);
}
