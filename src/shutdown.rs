//! Graceful shutdown wiring.
//!
//! A single Ctrl+C handler installed at program start. Before a server is
//! registered it exits the process directly; afterwards it unblocks the
//! HTTP accept loop so `main` can wind the reloader down and return.

use std::sync::{Arc, OnceLock};

use tiny_http::Server;

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else {
            // Nothing bound yet, nothing to gracefully shut down.
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))
}

/// Register the HTTP server for graceful shutdown.
///
/// Call after binding, before entering the request loop.
pub fn register_server(server: Arc<Server>) {
    let _ = SERVER.set(server);
}
