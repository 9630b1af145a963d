//! `keyrec` - Keystroke-to-text session recorder
//!
//! This library decodes a stream of key press/release events into editable
//! text for a bounded session, persists the result, and samples system
//! statistics alongside continuous monitoring runs.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod monitor;
pub mod recorder;
pub mod signal;
pub mod sink;
pub mod stats;
pub mod terminal;

pub use buffer::TextBuffer;
pub use config::Config;
pub use error::{Error, Result};
pub use event::{
    ChannelSource, EventSource, KeyAction, KeyEvent, KeyPhase, NextEvent, ReplaySource,
};
pub use logging::init_logging;
pub use monitor::{Monitor, MonitorReport, StatsPlan};
pub use recorder::{KeyRecorder, RecorderConfig, Recording, StopReason};
pub use signal::StopHandle;
pub use sink::{FileSink, MemorySink, TextSink};
pub use stats::{SystemSampler, SystemSnapshot};
pub use terminal::TerminalSource;
