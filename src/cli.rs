//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// voicebridge - bridge phone calls to a real-time speech pipeline
#[derive(Debug, Parser)]
#[command(name = "voicebridge", version, about)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the listen port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the webhook server and media bridge (default)
    Serve,
    /// Validate the configuration and report missing settings
    CheckConfig,
}

impl Cli {
    /// Log filter directive for the chosen verbosity.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "voicebridge=info",
            1 => "voicebridge=debug",
            _ => "voicebridge=trace",
        }
    }
}
