//! System statistics sampling.
//!
//! CPU and memory figures come from `sysinfo`. GPU figures come from
//! `nvidia-smi` when it is installed; machines without it simply report no
//! GPUs.

use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::System;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::signal::StopHandle;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Fields requested from `nvidia-smi`, in output order.
const NVIDIA_SMI_QUERY: &str = "name,memory.total,memory.used,memory.free,temperature.gpu";

/// Memory usage at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    /// Total physical memory in bytes.
    pub total_bytes: u64,
    /// Used memory in bytes.
    pub used_bytes: u64,
    /// Free memory in bytes.
    pub free_bytes: u64,
}

impl MemorySnapshot {
    /// Used memory as a percentage of total.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn usage_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.total_bytes as f64 * 100.0
        }
    }
}

/// Convert bytes to GiB.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_gib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GIB
}

/// One GPU as reported by `nvidia-smi`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuSnapshot {
    /// Marketing name of the device.
    pub name: String,
    /// Total memory in MiB.
    pub memory_total_mb: f64,
    /// Used memory in MiB.
    pub memory_used_mb: f64,
    /// Free memory in MiB.
    pub memory_free_mb: f64,
    /// Core temperature in degrees Celsius.
    pub temperature_c: f64,
}

impl GpuSnapshot {
    /// Used memory as a percentage of total.
    #[must_use]
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total_mb <= 0.0 {
            0.0
        } else {
            self.memory_used_mb / self.memory_total_mb * 100.0
        }
    }
}

/// Parse `nvidia-smi --format=csv,noheader,nounits` output.
///
/// Lines that don't have all fields, or whose numbers don't parse, are
/// skipped. The name is split from the right so commas inside it survive.
#[must_use]
pub fn parse_nvidia_smi(output: &str) -> Vec<GpuSnapshot> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.rsplitn(5, ',').map(str::trim);
            let temperature_c = fields.next()?.parse().ok()?;
            let memory_free_mb = fields.next()?.parse().ok()?;
            let memory_used_mb = fields.next()?.parse().ok()?;
            let memory_total_mb = fields.next()?.parse().ok()?;
            let name = fields.next()?.to_string();
            Some(GpuSnapshot {
                name,
                memory_total_mb,
                memory_used_mb,
                memory_free_mb,
                temperature_c,
            })
        })
        .collect()
}

fn query_gpus() -> Vec<GpuSnapshot> {
    let output = Command::new("nvidia-smi")
        .arg(format!("--query-gpu={NVIDIA_SMI_QUERY}"))
        .arg("--format=csv,noheader,nounits")
        .output();

    match output {
        Ok(output) if output.status.success() => {
            parse_nvidia_smi(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!(status = %output.status, "nvidia-smi returned an error");
            Vec::new()
        }
        Err(e) => {
            debug!(error = %e, "nvidia-smi not available");
            Vec::new()
        }
    }
}

/// A full system reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    /// When the reading finished.
    pub timestamp: DateTime<Utc>,
    /// Global CPU usage in percent.
    pub cpu_percent: f32,
    /// Physical memory.
    pub memory: MemorySnapshot,
    /// GPUs, empty if none were found.
    pub gpus: Vec<GpuSnapshot>,
}

impl SystemSnapshot {
    /// Emit the snapshot as log lines at info level.
    pub fn log(&self) {
        info!(cpu_percent = %format!("{:.1}", self.cpu_percent), "CPU usage");
        info!(
            total_gb = %format!("{:.2}", to_gib(self.memory.total_bytes)),
            used_gb = %format!("{:.2}", to_gib(self.memory.used_bytes)),
            free_gb = %format!("{:.2}", to_gib(self.memory.free_bytes)),
            usage_percent = %format!("{:.1}", self.memory.usage_percent()),
            "Memory usage"
        );
        for gpu in &self.gpus {
            info!(
                name = %gpu.name,
                total_mb = gpu.memory_total_mb,
                used_mb = gpu.memory_used_mb,
                free_mb = gpu.memory_free_mb,
                usage_percent = %format!("{:.1}", gpu.memory_percent()),
                temperature_c = gpu.temperature_c,
                "GPU usage"
            );
        }
    }
}

/// Takes system readings.
#[derive(Debug)]
pub struct SystemSampler {
    system: System,
    cpu_window: Duration,
    gpu_enabled: bool,
}

impl SystemSampler {
    /// Create a sampler.
    ///
    /// CPU usage is measured over `cpu_window`; it is raised to sysinfo's
    /// minimum update interval if shorter.
    #[must_use]
    pub fn new(cpu_window: Duration, gpu_enabled: bool) -> Self {
        Self {
            system: System::new(),
            cpu_window: cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
            gpu_enabled,
        }
    }

    /// Take a reading. Blocks for the CPU measurement window.
    pub fn sample(&mut self) -> SystemSnapshot {
        self.system.refresh_cpu_usage();
        std::thread::sleep(self.cpu_window);
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        SystemSnapshot {
            timestamp: Utc::now(),
            cpu_percent: self.system.global_cpu_usage(),
            memory: MemorySnapshot {
                total_bytes: self.system.total_memory(),
                used_bytes: self.system.used_memory(),
                free_bytes: self.system.free_memory(),
            },
            gpus: if self.gpu_enabled {
                query_gpus()
            } else {
                Vec::new()
            },
        }
    }
}

/// Log a snapshot every `interval` until `stop` fires.
///
/// Sampling runs on the blocking pool. Returns the number of snapshots taken.
///
/// # Errors
///
/// Returns an internal error if a sampling task panics.
pub async fn run_sampler(
    mut sampler: SystemSampler,
    interval: Duration,
    stop: StopHandle,
) -> Result<u64> {
    let mut taken = 0u64;
    info!(interval_secs = interval.as_secs(), "Stats sampler started");

    while !stop.is_stopped() {
        let (returned, snapshot) = tokio::task::spawn_blocking(move || {
            let snapshot = sampler.sample();
            (sampler, snapshot)
        })
        .await
        .map_err(|e| Error::internal(format!("stats task failed: {e}")))?;
        sampler = returned;

        snapshot.log();
        taken += 1;

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = stop.stopped() => break,
        }
    }

    if taken == 0 {
        warn!("Stats sampler stopped before taking a snapshot");
    }
    info!(snapshots = taken, "Stats sampler stopped");
    Ok(taken)
}
