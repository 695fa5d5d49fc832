//! `cutter` - command-line controller for cardboard
//!
//! Sends one command over the cardboard socket and prints the reply:
//!
//! ```text
//! cutter bind super+return exec alacritty
//! cutter workspace switch 1
//! cutter query focused
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use cardboard::config;
use cardboard::ipc::send_command;

#[derive(Parser)]
#[command(name = "cutter")]
#[command(about = "Send a command to a running cardboard instance")]
#[command(version)]
struct Cli {
    /// Socket to talk to; defaults to $CARDBOARD_SOCKET or /tmp/cardboard-$WAYLAND_DISPLAY
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Command name followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let socket = cli.socket.unwrap_or_else(config::ipc_socket_path);

    let reply = send_command(&socket, &cli.command).await?;
    if !reply.is_empty() {
        println!("{}", reply);
    }
    Ok(())
}
