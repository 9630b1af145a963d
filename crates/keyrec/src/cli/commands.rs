//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Record one session from this terminal.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Session length in seconds (defaults to the configured length)
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// File to write the recorded text to
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the recording summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Decode a JSON-lines event log into text.
#[derive(Debug, Args)]
pub struct ReplayCommand {
    /// Event log with one `{"name": ..., "phase": ...}` object per line
    #[arg(value_name = "EVENTS")]
    pub events: PathBuf,

    /// File to write the decoded text to (prints to stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Record back-to-back sessions and sample system stats until stopped.
#[derive(Debug, Args)]
pub struct MonitorCommand {
    /// File each session's text is written to
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Don't sample system statistics
    #[arg(long)]
    pub no_stats: bool,
}

/// Take system statistics snapshots.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Number of snapshots to take
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: u32,

    /// Seconds between snapshots
    #[arg(short, long, default_value_t = 1)]
    pub interval: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to configuration file (uses default if not specified)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}
