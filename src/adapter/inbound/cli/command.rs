//! Command-line interface definitions.
//!
//! Defines the CLI structure for the `stowage` operator tool using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect and manage cluster allocations in the configured storage
#[derive(Parser, Debug)]
#[command(name = "stowage")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "stowage.toml")]
    pub config: PathBuf,

    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Install this choice as the process-wide `owo_colors` override.
    pub fn apply(self) {
        match self {
            Self::Auto => owo_colors::unset_override(),
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to the configured storage and report its capabilities
    Check,

    /// Manage cluster node allocations
    #[command(subcommand, alias = "allocation")]
    Allocations(AllocationCommand),
}

/// Subcommands for `stowage allocations`.
#[derive(Subcommand, Debug)]
pub enum AllocationCommand {
    /// List every registered allocation
    List,
    /// Register an allocation, or refresh its heartbeat
    Register {
        /// Allocation id; a random UUID is generated when omitted
        id: Option<String>,
    },
    /// Remove an allocation together with the presences and resources it owns
    Unregister { id: String },
    /// Show an allocation and everything it owns
    Show { id: String },
}
