//! Command line entry points

pub mod serve;

use clap::{Parser, Subcommand};

/// Connectly - social feed API
#[derive(Parser)]
#[command(name = "connectly")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve(serve::ServeArgs),
}
