//! HTTP surface: binding with port retry, the request loop, and handlers.

mod encoding;
mod handler;
mod listing;


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tiny_http::Server;

use crate::log;
use crate::runfiles::Runfiles;
use crate::snapshot::Container;
use handler::RequestContext;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Fixed-at-startup server parameters.
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// The port was asked for explicitly: bind conflicts are fatal instead
    /// of retried on the next port.
    pub port_pinned: bool,
    /// Display label shown on listing pages.
    pub label: String,
}

/// One server instance. Owns its container reference and configuration so
/// independent instances can coexist (e.g. in tests).
pub struct AssetServer {
    config: ServerConfig,
    container: Arc<Container>,
    runfiles: Runfiles,
}

impl AssetServer {
    pub fn new(config: ServerConfig, container: Arc<Container>, runfiles: Runfiles) -> Self {
        Self {
            config,
            container,
            runfiles,
        }
    }

    /// Bind the listening socket without starting the request loop.
    pub fn bind(self) -> Result<BoundServer> {
        let (server, addr) = bind_with_retry(self.config.bind, self.config.port_pinned)?;
        let server = Arc::new(server);
        crate::shutdown::register_server(Arc::clone(&server));
        log!("serve"; "{} listening on http://{addr}/", self.config.label);
        Ok(BoundServer {
            server,
            addr,
            context: Arc::new(RequestContext {
                container: self.container,
                runfiles: self.runfiles,
                label: self.config.label,
            }),
        })
    }
}

/// Bound server ready to accept requests.
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    context: Arc<RequestContext>,
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the request loop (blocking until the server is unblocked).
    ///
    /// Requests are handled on a small worker pool so one slow asset read
    /// does not stall the others. Handler errors are caught at the task
    /// boundary and logged; they never terminate the pool.
    pub fn run(self) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .map_err(|e| anyhow!("failed to create request pool: {e}"))?;

        for request in self.server.incoming_requests() {
            let context = Arc::clone(&self.context);
            pool.spawn(move || {
                if let Err(e) = handler::handle(request, &context) {
                    log!("serve"; "request error: {e:#}");
                }
            });
        }
        Ok(())
    }
}

/// Bind to the given address, retrying on the next port unless pinned.
fn bind_with_retry(base: SocketAddr, pinned: bool) -> Result<(Server, SocketAddr)> {
    let attempts = if pinned { 1 } else { MAX_PORT_RETRIES };
    let mut last_error = None;

    for offset in 0..attempts {
        let addr = SocketAddr::new(base.ip(), base.port().saturating_add(offset));
        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base.port(), addr.port());
                }
                // server_addr resolves an ephemeral port 0 request.
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    let detail = last_error.map(|e| e.to_string()).unwrap_or_default();
    if pinned {
        Err(anyhow!("failed to bind {base}: {detail}"))
    } else {
        Err(anyhow!(
            "failed to bind after {MAX_PORT_RETRIES} attempts starting at {base}: {detail}"
        ))
    }
}
