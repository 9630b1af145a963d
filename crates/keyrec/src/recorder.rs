//! Keystroke recording sessions.
//!
//! A [`KeyRecorder`] owns an event source for exactly one session. Calling
//! [`KeyRecorder::record`] consumes it and yields a frozen [`Recording`], so a
//! session can never go back to accepting events once it has stopped.
//!
//! Two threads of control cooperate during a session:
//!
//! - a blocking reader (on tokio's blocking pool) that polls the source and
//!   owns the [`TextBuffer`];
//! - the calling task, which races the time limit against the caller's
//!   [`StopHandle`] and then asks the reader to stop.
//!
//! The buffer comes back through the reader's join handle, so it is only read
//! after the reader has finished. Stopping is cooperative: the reader checks
//! its stop flag between polls, which bounds the stop latency to one
//! `poll_interval` plus the time to apply a single event. Dropping the
//! `record` future also stops the reader.
//!
//! The reader does not log. Its outcome is logged once it has returned and the
//! source (possibly holding the terminal in raw mode) has been dropped.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::TextBuffer;
use crate::error::{Error, Result};
use crate::event::{EventSource, NextEvent};
use crate::signal::StopHandle;
use crate::sink::TextSink;

/// Default upper bound on a single source poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The time limit elapsed.
    Elapsed,
    /// The caller's stop handle fired.
    Cancelled,
    /// A finite source ran out of events.
    SourceExhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Elapsed => write!(f, "elapsed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::SourceExhausted => write!(f, "source_exhausted"),
        }
    }
}

/// Session timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Maximum wall-clock length of the session.
    pub limit: Duration,
    /// Upper bound on each source poll; also the stop latency bound.
    pub poll_interval: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            limit: Duration::from_secs(10),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The result of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recording {
    /// Final buffer contents.
    pub text: String,
    /// Events read from the source, including ignored ones.
    pub events_seen: u64,
    /// Events that changed the buffer.
    pub events_applied: u64,
    /// Why the session ended.
    pub stop_reason: StopReason,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// When the reader was joined.
    pub ended_at: DateTime<Utc>,
    /// BLAKE3 hash of `text`.
    pub content_hash: String,
}

impl Recording {
    /// Compute the BLAKE3 hash of the given text.
    #[must_use]
    pub fn compute_hash(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    /// Wall-clock length of the session.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }

    /// Write the text to `sink`, replacing its contents.
    ///
    /// The recording is left untouched, so a failed flush can be retried or
    /// redirected to another sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SinkWrite`] carrying a copy of the text.
    pub fn flush<K: TextSink + ?Sized>(&self, sink: &mut K) -> Result<()> {
        sink.write(&self.text).map_err(|source| Error::SinkWrite {
            sink: sink.describe(),
            source,
            recovered: self.text.clone(),
        })?;
        info!(
            sink = %sink.describe(),
            chars = self.text.chars().count(),
            hash = %self.content_hash,
            "Recording saved"
        );
        Ok(())
    }
}

/// What the reader hands back when it stops.
#[derive(Debug)]
struct ReaderOutcome {
    buffer: TextBuffer,
    events_seen: u64,
    events_applied: u64,
    exhausted: bool,
    error: Option<Error>,
}

/// Poll `source` until `stop` fires, the source is exhausted, or it fails.
fn read_until_stopped<S: EventSource + ?Sized>(
    source: &mut S,
    stop: &StopHandle,
    poll_interval: Duration,
) -> ReaderOutcome {
    let mut outcome = ReaderOutcome {
        buffer: TextBuffer::new(),
        events_seen: 0,
        events_applied: 0,
        exhausted: false,
        error: None,
    };

    while !stop.is_stopped() {
        match source.next_event(poll_interval) {
            Ok(NextEvent::Key(event)) => {
                outcome.events_seen += 1;
                if outcome.buffer.apply(&event) {
                    outcome.events_applied += 1;
                }
            }
            Ok(NextEvent::Idle) => {}
            Ok(NextEvent::Exhausted) => {
                outcome.exhausted = true;
                break;
            }
            Err(e) => {
                outcome.error = Some(e);
                break;
            }
        }
    }

    outcome
}

/// Fires the reader's stop flag when the session future goes away.
struct StopOnDrop(StopHandle);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Records one session of key events into text.
#[derive(Debug)]
pub struct KeyRecorder<S> {
    source: S,
    config: RecorderConfig,
}

impl<S> KeyRecorder<S>
where
    S: EventSource + 'static,
{
    /// Create a recorder for a single session.
    #[must_use]
    pub fn new(source: S, config: RecorderConfig) -> Self {
        Self { source, config }
    }

    /// Record until the time limit elapses, `cancel` fires, or the source is
    /// exhausted.
    ///
    /// `cancel` is only observed, never triggered, so one handle can govern
    /// several consecutive sessions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventSource`] with the text decoded so far if the
    /// source fails mid-session, or [`Error::Internal`] if the reader thread
    /// panicked.
    pub async fn record(self, cancel: &StopHandle) -> Result<Recording> {
        let Self { mut source, config } = self;
        let source_name = source.name();
        let started_at = Utc::now();
        debug!(
            source = source_name,
            limit_ms = config.limit.as_millis(),
            poll_ms = config.poll_interval.as_millis(),
            "Recording session started"
        );

        let reader_stop = StopOnDrop(StopHandle::new());
        let mut reader = tokio::task::spawn_blocking({
            let stop = reader_stop.0.clone();
            move || read_until_stopped(&mut source, &stop, config.poll_interval)
        });

        let (reason, finished_early) = tokio::select! {
            () = tokio::time::sleep(config.limit) => (StopReason::Elapsed, None),
            () = cancel.stopped() => (StopReason::Cancelled, None),
            joined = &mut reader => (StopReason::SourceExhausted, Some(joined)),
        };

        drop(reader_stop);
        let joined = match finished_early {
            Some(joined) => joined,
            None => reader.await,
        };
        let outcome = joined.map_err(|e| Error::internal(format!("reader task failed: {e}")))?;

        let text = outcome.buffer.as_string();
        if let Some(err) = outcome.error {
            warn!(source = source_name, error = %err, "Event source failed");
            return Err(err.with_recovered(text));
        }
        if outcome.exhausted {
            debug!(source = source_name, "Event source exhausted");
        }
        // The source may run dry in the same instant the timer fires.
        let reason = if outcome.exhausted {
            StopReason::SourceExhausted
        } else {
            reason
        };

        let recording = Recording {
            content_hash: Recording::compute_hash(&text),
            text,
            events_seen: outcome.events_seen,
            events_applied: outcome.events_applied,
            stop_reason: reason,
            started_at,
            ended_at: Utc::now(),
        };
        info!(
            source = source_name,
            reason = %recording.stop_reason,
            events = recording.events_seen,
            applied = recording.events_applied,
            "Recording session stopped"
        );
        Ok(recording)
    }

    /// Record a session and flush it to `sink`.
    ///
    /// # Errors
    ///
    /// Returns any error from [`KeyRecorder::record`], or
    /// [`Error::SinkWrite`] (carrying the text) if the flush fails.
    pub async fn record_to<K: TextSink + ?Sized>(
        self,
        cancel: &StopHandle,
        sink: &mut K,
    ) -> Result<Recording> {
        let recording = self.record(cancel).await?;
        recording.flush(sink)?;
        Ok(recording)
    }
}
