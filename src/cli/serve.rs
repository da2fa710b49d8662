//! Serve command handler
//!
//! Starts the HTTP server in foreground mode.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::server;
use crate::server::state::AppState;
use clap::Args;
use std::sync::Arc;
use tracing::info;

/// Serve command arguments
#[derive(Args)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
}

/// Run the serve command
///
/// The rest of the CLI is blocking, so the runtime lives only here. The
/// state is created before entering it and released after leaving it.
pub fn run(args: ServeArgs) -> Result<()> {
    // Load and optionally override config
    let mut config = Config::load()?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!(
        "Starting coin-atlas server v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.server_addr()
    );

    let addr = config.server_addr();
    let state = Arc::new(AppState::new(config)?);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Server(format!("Failed to start runtime: {}", e)))?;
    let result = runtime.block_on(server::run(&addr, Arc::clone(&state)));
    drop(runtime);
    drop(state);
    result
}
