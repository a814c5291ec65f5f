//! webserve - a live development server for build-produced web assets.
//!
//! Serves the assets declared by build manifests while the source tree is
//! being edited. A background reloader keeps an immutable snapshot of the
//! build graph fresh; every request is answered from one consistent
//! snapshot capture, so edits never produce a half-updated view.

#![allow(dead_code)]

mod cli;
mod loader;
mod logger;
mod manifest;
mod mime;
mod reloader;
mod runfiles;
mod server;
mod shutdown;
mod snapshot;
mod utils;
mod webpath;

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};

use cli::{Cli, DEFAULT_PORT};
use loader::Loader;
use reloader::Reloader;
use runfiles::Runfiles;
use server::{AssetServer, ServerConfig};
use snapshot::Container;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    shutdown::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let runfiles = Runfiles::discover(cli.runfiles_root.clone());
    let label = cli
        .label
        .clone()
        .unwrap_or_else(|| manifest::peek_label(&cli.config));

    let container = Arc::new(Container::new());
    let loader = Arc::new(Loader::new(
        runfiles.clone(),
        Arc::clone(&container),
        cli.config.clone(),
    ));

    // Returns once the first load has completed: the startup barrier that
    // keeps us from accepting connections against an empty snapshot.
    let reloader = Reloader::spawn(Arc::clone(&container), loader)?;

    let (bind, port_pinned) = match cli.bind {
        Some(addr) => (addr, true),
        None => (
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), DEFAULT_PORT),
            false,
        ),
    };

    let server = AssetServer::new(
        ServerConfig {
            bind,
            port_pinned,
            label,
        },
        container,
        runfiles,
    );
    server.bind()?.run()?;

    // Closes the watch handle and joins the background thread.
    drop(reloader);
    Ok(())
}
