//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use upkeep_types::ColorChoice;

/// upkeep - keep a host's packages and repositories in step with its backend
#[derive(Parser)]
#[command(name = "upkeep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Package update controller for a simulated host")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the upkeep log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Host fixture describing the simulated backend
    #[arg(long, global = true, value_name = "PATH", env = "UPKEEP_FIXTURE")]
    pub fixture: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// List packages known to the backend
    #[command(alias = "ls")]
    List {
        /// Only show packages with an update available
        #[arg(long)]
        updates: bool,
    },

    /// List repositories, including virtual channel placeholders
    Repos,

    /// Run a reconciliation pass and show pending updates
    Check,

    /// Update packages
    #[command(alias = "up")]
    Update {
        /// Package names to update (empty = every updatable package)
        packages: Vec<String>,
    },

    /// Remove packages
    #[command(alias = "rm")]
    Remove {
        /// Package names to remove
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Enable a repository or materialise a virtual channel
    EnableRepo {
        /// Repository id
        id: String,
    },

    /// Disable a repository
    DisableRepo {
        /// Repository id
        id: String,
    },

    /// Keep the controller running and print events until interrupted
    Watch,
}

impl Commands {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::List { .. } => "list",
            Commands::Repos => "repos",
            Commands::Check => "check",
            Commands::Update { .. } => "update",
            Commands::Remove { .. } => "remove",
            Commands::EnableRepo { .. } => "enable-repo",
            Commands::DisableRepo { .. } => "disable-repo",
            Commands::Watch => "watch",
        }
    }
}
