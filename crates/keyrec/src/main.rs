//! `keyrec` - CLI for the keystroke session recorder
//!
//! This binary records keys typed into its own terminal, replays event logs,
//! runs continuous monitoring and prints system statistics.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use keyrec::cli::{
    Cli, Command, ConfigCommand, MonitorCommand, OutputFormat, RecordCommand, ReplayCommand,
    StatsCommand,
};
use keyrec::logging::{init_logging_with_file, Verbosity};
use keyrec::stats::to_gib;
use keyrec::{
    init_logging, Config, FileSink, KeyRecorder, Monitor, RecorderConfig, Recording, ReplaySource,
    StatsPlan, StopHandle, SystemSampler, SystemSnapshot, TerminalSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load_from(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbosity());
            return Err(e).context("failed to load configuration");
        }
    };
    setup_logging(&config, cli.verbosity())?;

    match cli.command {
        Command::Record(cmd) => handle_record(&config, cmd).await,
        Command::Replay(cmd) => handle_replay(cmd).await,
        Command::Monitor(cmd) => handle_monitor(&config, cmd).await,
        Command::Stats(cmd) => handle_stats(&config, cmd).await,
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn setup_logging(config: &Config, verbosity: Verbosity) -> Result<()> {
    match &config.logging.log_dir {
        Some(dir) => {
            let path = init_logging_with_file(verbosity, dir)
                .with_context(|| format!("failed to set up logging in {}", dir.display()))?;
            tracing::debug!(path = %path.display(), "Logging to file");
        }
        None => init_logging(verbosity),
    }
    Ok(())
}

async fn handle_record(config: &Config, cmd: RecordCommand) -> Result<()> {
    let mut recorder_config = config.recorder_config();
    if let Some(secs) = cmd.duration {
        if secs == 0 {
            bail!("--duration must be greater than 0");
        }
        recorder_config.limit = Duration::from_secs(secs);
    }
    let output = cmd.output.unwrap_or_else(|| config.output_path());

    eprintln!(
        "Recording keys typed in this terminal for {}s. Press Esc or Ctrl+C to stop.",
        recorder_config.limit.as_secs()
    );

    let stop = StopHandle::new();
    let source = TerminalSource::new(stop.clone())?;
    let mut sink = FileSink::new(&output);

    let recording = match KeyRecorder::new(source, recorder_config)
        .record_to(&stop, &mut sink)
        .await
    {
        Ok(recording) => recording,
        Err(e) => {
            // Nothing typed is lost: hand the text back on stdout.
            if let Some(text) = e.recovered_text() {
                eprintln!("Recording failed; recovered text follows on stdout.");
                println!("{text}");
            }
            return Err(e.into());
        }
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&recording)?);
    } else {
        print_summary(&recording, &output.display().to_string());
    }
    Ok(())
}

fn print_summary(recording: &Recording, destination: &str) {
    println!("keyrec session");
    println!("--------------");
    println!("Saved to:      {destination}");
    println!("Characters:    {}", recording.text.chars().count());
    println!(
        "Events:        {} ({} applied)",
        recording.events_seen, recording.events_applied
    );
    println!("Stopped:       {}", recording.stop_reason);
    let elapsed = recording.elapsed().to_std().unwrap_or_default();
    println!("Duration:      {:.1}s", elapsed.as_secs_f64());
}

async fn handle_replay(cmd: ReplayCommand) -> Result<()> {
    let source = ReplaySource::from_jsonl(&cmd.events)?;
    let config = RecorderConfig {
        limit: Duration::MAX,
        poll_interval: Duration::ZERO,
    };

    let recording = KeyRecorder::new(source, config)
        .record(&StopHandle::new())
        .await?;

    match cmd.output {
        Some(path) => {
            recording.flush(&mut FileSink::new(&path))?;
            print_summary(&recording, &path.display().to_string());
        }
        None => print!("{}", recording.text),
    }
    Ok(())
}

async fn handle_monitor(config: &Config, cmd: MonitorCommand) -> Result<()> {
    let output = cmd.output.unwrap_or_else(|| config.output_path());
    let stop = StopHandle::new();

    // Between sessions the terminal is in cooked mode and Ctrl+C is a signal.
    tokio::spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.stop();
            }
        }
    });

    let mut monitor = Monitor::new(config.recorder_config(), stop.clone());
    if config.stats.enabled && !cmd.no_stats {
        monitor = monitor.with_stats(StatsPlan {
            sampler: SystemSampler::new(config.cpu_window(), config.stats.gpu_enabled),
            interval: config.stats_interval(),
        });
    }

    eprintln!(
        "Monitoring: recording keys typed in this terminal to {}. Press Esc or Ctrl+C to stop.",
        output.display()
    );

    let mut sink = FileSink::new(&output);
    let report = monitor
        .run(|| TerminalSource::new(stop.clone()), &mut sink)
        .await?;

    println!(
        "Monitoring stopped: {} sessions saved, {} failed saves, {} source failures, {} stats snapshots",
        report.sessions, report.failed_flushes, report.source_failures, report.snapshots
    );
    Ok(())
}

async fn handle_stats(config: &Config, cmd: StatsCommand) -> Result<()> {
    let mut sampler = SystemSampler::new(config.cpu_window(), config.stats.gpu_enabled);

    for i in 0..cmd.count {
        if i > 0 {
            tokio::time::sleep(Duration::from_secs(cmd.interval)).await;
        }
        let (returned, snapshot) = tokio::task::spawn_blocking(move || {
            let snapshot = sampler.sample();
            (sampler, snapshot)
        })
        .await?;
        sampler = returned;

        match cmd.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&snapshot)?),
            OutputFormat::Text => print_snapshot(&snapshot),
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &SystemSnapshot) {
    println!("CPU usage:          {:.1}%", snapshot.cpu_percent);
    println!("------");
    let memory = &snapshot.memory;
    println!("Total RAM:          {:.2} GB", to_gib(memory.total_bytes));
    println!("Used RAM:           {:.2} GB", to_gib(memory.used_bytes));
    println!("Free RAM:           {:.2} GB", to_gib(memory.free_bytes));
    println!("Memory usage:       {:.1}%", memory.usage_percent());
    println!("------");
    if snapshot.gpus.is_empty() {
        println!("GPU:                none detected");
    }
    for gpu in &snapshot.gpus {
        println!("GPU:                {}", gpu.name);
        println!("GPU Memory Total:   {} MB", gpu.memory_total_mb);
        println!("GPU Memory Used:    {} MB", gpu.memory_used_mb);
        println!("GPU Memory Free:    {} MB", gpu.memory_free_mb);
        println!("GPU Memory Usage:   {:.1}%", gpu.memory_percent());
        println!("GPU Temperature:    {} °C", gpu.temperature_c);
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Recorder]");
                println!("  Session length:     {}s", config.recorder.session_secs);
                println!("  Poll interval:      {}ms", config.recorder.poll_interval_ms);
                println!("  Output path:        {}", config.output_path().display());
                println!();
                println!("[Stats]");
                println!("  Enabled:            {}", config.stats.enabled);
                println!("  Interval:           {}s", config.stats.interval_secs);
                println!("  CPU window:         {}ms", config.stats.cpu_window_ms);
                println!("  GPU:                {}", config.stats.gpu_enabled);
                println!();
                println!("[Logging]");
                match &config.logging.log_dir {
                    Some(dir) => println!("  Log directory:      {}", dir.display()),
                    None => println!("  Log directory:      (stderr only)"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
