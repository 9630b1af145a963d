//! Key events and the sources that produce them.
//!
//! Every capture mechanism decodes its native representation into a
//! [`KeyEvent`] at the boundary. The rest of the crate only sees key names
//! and a press/release phase.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Transition direction of a physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPhase {
    /// The key was pressed (or auto-repeated).
    Down,
    /// The key was released.
    Up,
}

impl std::fmt::Display for KeyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Down => write!(f, "down"),
            Self::Up => write!(f, "up"),
        }
    }
}

/// A single key transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Identifier of the physical key: a single character for printable
    /// keys, a lowercase word (`"space"`, `"enter"`, `"shift"`) otherwise.
    pub name: String,
    /// Press or release.
    pub phase: KeyPhase,
}

impl KeyEvent {
    /// Create a key-down event.
    #[must_use]
    pub fn down(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: KeyPhase::Down,
        }
    }

    /// Create a key-up event.
    #[must_use]
    pub fn up(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: KeyPhase::Up,
        }
    }

    /// Decode this event into a buffer action.
    #[must_use]
    pub fn action(&self) -> KeyAction {
        KeyAction::decode(self)
    }
}

/// What a key event does to the text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Append a character.
    Insert(char),
    /// Remove the last character, if any.
    Delete,
    /// Leave the buffer unchanged.
    Ignore,
}

impl KeyAction {
    /// Decode a key event.
    ///
    /// Release events are always ignored. Multi-character key names other
    /// than `space`, `enter` and `backspace` are dropped, so modifiers,
    /// arrows and function keys never reach the text.
    #[must_use]
    pub fn decode(event: &KeyEvent) -> Self {
        if event.phase != KeyPhase::Down {
            return Self::Ignore;
        }

        match event.name.as_str() {
            "space" => Self::Insert(' '),
            "enter" => Self::Insert('\n'),
            "backspace" => Self::Delete,
            name => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Insert(c),
                    _ => Self::Ignore,
                }
            }
        }
    }
}

/// Result of polling an event source once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextEvent {
    /// A key transition arrived.
    Key(KeyEvent),
    /// Nothing arrived within the poll timeout.
    Idle,
    /// The source has no more events and never will.
    Exhausted,
}

/// A feed of key events.
///
/// `next_event` must return within roughly `timeout` so the reading thread
/// can notice a stop request between polls.
pub trait EventSource: Send {
    /// The name of this source (for logging and errors).
    fn name(&self) -> &'static str;

    /// Wait up to `timeout` for the next key transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventSource`] if the underlying feed became
    /// unavailable.
    fn next_event(&mut self, timeout: Duration) -> Result<NextEvent>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn next_event(&mut self, timeout: Duration) -> Result<NextEvent> {
        (**self).next_event(timeout)
    }
}

/// A finite, pre-recorded sequence of events.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    events: VecDeque<KeyEvent>,
}

impl ReplaySource {
    /// Create a replay source from a list of events.
    #[must_use]
    pub fn new(events: impl IntoIterator<Item = KeyEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Parse a JSON-lines event log, one [`KeyEvent`] object per line.
    ///
    /// Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventLog`] naming the first malformed line.
    pub fn parse_jsonl(path: &Path, contents: &str) -> Result<Self> {
        let mut events = VecDeque::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event = serde_json::from_str::<KeyEvent>(line).map_err(|e| Error::EventLog {
                path: path.to_path_buf(),
                line: idx + 1,
                message: e.to_string(),
            })?;
            events.push_back(event);
        }
        Ok(Self { events })
    }

    /// Load a JSON-lines event log from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is malformed.
    pub fn from_jsonl(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::parse_jsonl(path, &contents)
    }

    /// Number of events not yet delivered.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn next_event(&mut self, _timeout: Duration) -> Result<NextEvent> {
        Ok(self
            .events
            .pop_front()
            .map_or(NextEvent::Exhausted, NextEvent::Key))
    }
}

/// Events pushed from another thread through a standard channel.
///
/// Dropping every sender while a session is running is treated as the feed
/// disappearing, not as a clean end of input.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<KeyEvent>,
}

impl ChannelSource {
    /// Wrap a receiver.
    #[must_use]
    pub fn new(rx: Receiver<KeyEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for ChannelSource {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn next_event(&mut self, timeout: Duration) -> Result<NextEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(NextEvent::Key(event)),
            Err(RecvTimeoutError::Timeout) => Ok(NextEvent::Idle),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::event_source(self.name(), "sender disconnected"))
            }
        }
    }
}
