//! # Cardboard window manager core
//!
//! A scrollable tiling window manager: views are laid out in columns on a
//! horizontally scrollable plane, one workspace per output, and an external
//! controller drives everything through a tiny command socket.
//!
//! ## Architecture
//!
//! - `server`: owns all state and runs the single-threaded event loop
//! - `workspace`: columns of tiles, floating views, scrolling and fullscreen
//! - `seat`: focus stack, keyboard/pointer routing, interactive move/resize
//! - `layers`: panels and overlays, usable-area computation
//! - `ipc` and `commands`: the wire format and the command vocabulary
//! - `backend`: the display-server side, reported as typed events
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cardboard::{backend::HeadlessBackend, CardboardConfig, Server};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CardboardConfig::default();
//!     let socket = config.ipc_socket_path();
//!     let backend = HeadlessBackend::new().with_output(1920, 1080);
//!     let mut server = Server::new(config, Box::new(backend))?;
//!     let code = server.run(&socket, None).await?;
//!     std::process::exit(code)
//! }
//! ```

pub mod animation;
pub mod backend;
pub mod commands;
pub mod config;
pub mod desktop;
pub mod events;
pub mod geometry;
pub mod input;
pub mod ipc;
pub mod layers;
pub mod output;
pub mod seat;
pub mod server;
pub mod spawn;
pub mod view;
pub mod workspace;

// Re-export main types for easy access
pub use commands::CommandResult;
pub use config::CardboardConfig;
pub use events::{EventBus, ServerEvent};
pub use geometry::Rect;
pub use server::Server;

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for cardboard
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
