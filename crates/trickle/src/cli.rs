use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "trickle", version, about = "Bridge cloud irrigation controllers and robot vacuums into a local automation hub")]
pub struct Cli {
    /// Path to the TOML config file (default: ./trickle.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge daemon (default).
    Run,
    /// Validate the configuration and exit.
    Check,
}
