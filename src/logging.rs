use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Where and how much to log
#[derive(Debug, Clone)]
pub struct LogSettings<'a> {
    /// Directory for log files (e.g., "logs")
    pub log_dir: &'a Utf8Path,
    /// Prefix for log files (e.g., "replay-merger")
    pub log_prefix: &'a str,
    /// Use debug level instead of info
    pub debug_mode: bool,
    /// Also log to the console
    pub console_output: bool,
}

/// Create the log directory if it doesn't exist.
pub fn ensure_log_dir(log_dir: &Utf8Path) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Level filter: `RUST_LOG` wins, otherwise debug or info.
fn env_filter(debug_mode: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Setup logging with a daily rotating file and optional console output.
///
/// The library only emits `tracing` events; this is called once by the binary.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(settings: &LogSettings<'_>) -> Result<WorkerGuard> {
    ensure_log_dir(settings.log_dir)?;

    let file_appender = rolling::daily(settings.log_dir, settings.log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // Console layer is optional; Option<Layer> is itself a layer
    let console_layer = settings.console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(settings.debug_mode))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        settings.log_dir,
        settings.log_prefix,
        settings.debug_mode,
        settings.console_output
    );

    Ok(guard)
}
