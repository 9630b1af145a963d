//! Continuous monitoring: back-to-back recording sessions plus periodic
//! system statistics, all governed by one [`StopHandle`].
//!
//! Each session's text replaces the sink's contents when that session ends.
//! A failed flush is logged and the next session starts anyway. An event
//! source failure flushes whatever was recovered; after
//! [`MAX_CONSECUTIVE_SOURCE_FAILURES`] failures in a row the monitor gives up.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::event::EventSource;
use crate::recorder::{KeyRecorder, RecorderConfig};
use crate::signal::StopHandle;
use crate::sink::TextSink;
use crate::stats::{run_sampler, SystemSampler};

/// Source failures tolerated in a row before the monitor stops.
pub const MAX_CONSECUTIVE_SOURCE_FAILURES: u32 = 3;

/// Counters for a finished monitor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorReport {
    /// Sessions that completed and were flushed.
    pub sessions: u64,
    /// Sessions whose flush failed.
    pub failed_flushes: u64,
    /// Sessions that ended in an event source failure.
    pub source_failures: u64,
    /// Stats snapshots taken.
    pub snapshots: u64,
}

/// Stats sampling settings for a monitor run.
#[derive(Debug)]
pub struct StatsPlan {
    /// The sampler to run.
    pub sampler: SystemSampler,
    /// Time between snapshots.
    pub interval: Duration,
}

/// Runs recording sessions until stopped.
#[derive(Debug)]
pub struct Monitor {
    recorder: RecorderConfig,
    stats: Option<StatsPlan>,
    stop: StopHandle,
}

impl Monitor {
    /// Create a monitor. `stop` ends the run when fired.
    #[must_use]
    pub fn new(recorder: RecorderConfig, stop: StopHandle) -> Self {
        Self {
            recorder,
            stats: None,
            stop,
        }
    }

    /// Also sample system statistics during the run.
    #[must_use]
    pub fn with_stats(mut self, plan: StatsPlan) -> Self {
        self.stats = Some(plan);
        self
    }

    /// A handle that stops this monitor.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run sessions until the stop handle fires.
    ///
    /// `make_source` is called once per session.
    ///
    /// # Errors
    ///
    /// Returns an error if a source can't be created, the source fails too
    /// many times in a row, or a session hits an internal error. The stop
    /// handle is fired before returning in every case.
    pub async fn run<S, F, K>(self, mut make_source: F, sink: &mut K) -> Result<MonitorReport>
    where
        S: EventSource + 'static,
        F: FnMut() -> Result<S>,
        K: TextSink + ?Sized,
    {
        let Self {
            recorder,
            stats,
            stop,
        } = self;

        let stats_task: Option<JoinHandle<Result<u64>>> = stats.map(|plan| {
            let StatsPlan { sampler, interval } = plan;
            tokio::spawn(run_sampler(sampler, interval, stop.clone()))
        });

        info!(
            session_secs = recorder.limit.as_secs(),
            sink = %sink.describe(),
            "Monitoring started"
        );

        let result = run_sessions(recorder, &stop, &mut make_source, sink).await;

        stop.stop();
        let mut report = match result {
            Ok(report) => report,
            Err(e) => {
                join_stats(stats_task).await;
                return Err(e);
            }
        };
        report.snapshots = join_stats(stats_task).await;

        info!(
            sessions = report.sessions,
            failed_flushes = report.failed_flushes,
            source_failures = report.source_failures,
            "Monitoring stopped"
        );
        Ok(report)
    }
}

async fn run_sessions<S, F, K>(
    recorder: RecorderConfig,
    stop: &StopHandle,
    make_source: &mut F,
    sink: &mut K,
) -> Result<MonitorReport>
where
    S: EventSource + 'static,
    F: FnMut() -> Result<S>,
    K: TextSink + ?Sized,
{
    let mut report = MonitorReport::default();
    let mut consecutive_failures = 0u32;

    while !stop.is_stopped() {
        let source = make_source()?;
        match KeyRecorder::new(source, recorder).record(stop).await {
            Ok(recording) => {
                consecutive_failures = 0;
                if let Err(e) = recording.flush(sink) {
                    warn!(error = %e, "Failed to save session, continuing");
                    report.failed_flushes += 1;
                } else {
                    report.sessions += 1;
                }
            }
            Err(e) if e.is_event_source_error() => {
                report.source_failures += 1;
                consecutive_failures += 1;
                warn!(error = %e, consecutive = consecutive_failures, "Session ended early");

                if let Some(text) = e.recovered_text() {
                    if let Err(write_err) = sink.write(text) {
                        warn!(error = %write_err, "Failed to save recovered text");
                    }
                }

                if consecutive_failures >= MAX_CONSECUTIVE_SOURCE_FAILURES {
                    error!("Event source keeps failing, giving up");
                    return Err(e);
                }

                tokio::select! {
                    () = tokio::time::sleep(recorder.poll_interval) => {}
                    () = stop.stopped() => {}
                }
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

async fn join_stats(task: Option<JoinHandle<Result<u64>>>) -> u64 {
    let Some(task) = task else {
        return 0;
    };
    match task.await {
        Ok(Ok(taken)) => taken,
        Ok(Err(e)) => {
            warn!(error = %e, "Stats sampler failed");
            0
        }
        Err(e) => {
            warn!(error = %e, "Stats sampler task panicked");
            0
        }
    }
}
