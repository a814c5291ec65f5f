//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default HTTP port when no --bind is given.
pub const DEFAULT_PORT: u16 = 6006;

/// Live development server for build-produced web assets
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Primary server configuration file listing manifests and external assets
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Address to bind, e.g. 127.0.0.1:6006. When given, the port is
    /// pinned: a bind conflict is fatal instead of retried on the next port
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Display label shown on listing pages (default: the config's label)
    #[arg(short, long)]
    pub label: Option<String>,

    /// Execution-root directory for resolving manifest paths and the
    /// /_/runfiles escape hatch (default: $RUNFILES_DIR, then ..)
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub runfiles_root: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
