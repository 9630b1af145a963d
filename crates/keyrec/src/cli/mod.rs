//! Command-line interface for keyrec.
//!
//! This module provides the CLI structure for the `keyrec` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, MonitorCommand, OutputFormat, RecordCommand, ReplayCommand, StatsCommand,
};

/// keyrec - Record what you type into text
///
/// Decodes key presses typed into this terminal into text for a bounded
/// session and saves the result, optionally alongside periodic system
/// statistics.
#[derive(Debug, Parser)]
#[command(name = "keyrec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record one session of keys typed into this terminal
    Record(RecordCommand),

    /// Decode a recorded event log into text
    Replay(ReplayCommand),

    /// Record sessions continuously and sample system stats
    Monitor(MonitorCommand),

    /// Show CPU, memory and GPU usage
    Stats(StatsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
