//! Replay Merger - merge gameplay replays with their microphone tracks
//!
//! Headless command line front end for the processing engine.
//!
//! # Execution Flow
//!
//! 1. Parse arguments and load `ReplayMerger.yaml` from the config directory
//! 2. Initialize logging → `<log dir>/replay-merger.<date>`
//! 3. Create the tokio runtime
//! 4. Probe ffmpeg, then discover replays and check disk space
//! 5. Run the batch, printing one line per job event; Ctrl-C cancels, a second
//!    Ctrl-C stops replays that are already muxing
//! 6. Shutdown the tokio runtime with a 5s timeout
//!
//! # Exit Codes
//!
//! - `0`: every replay was processed
//! - `1`: at least one replay failed, or the batch was cancelled
//! - `2`: the batch could not start (no ffmpeg, no replays, not enough space)

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use replay_merger::logging::{LogSettings, setup_logging};
use replay_merger::services::{DiskSpaceGuard, FfmpegMuxer, ReplayProcessor, SystemOpener};
use replay_merger::{
    APP_NAME, ConfigManager, EngineConfig, JobStatus, ProcessingOptions, ProcessingOrchestrator,
    VERSION, prepare_session,
};
use std::process::ExitCode;
use std::time::Duration;

/// Merge `*_replay_*.mp4` recordings with their `.m4a` microphone tracks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder containing the replays (searched recursively)
    input: Utf8PathBuf,

    /// Folder the merged replays go to (defaults to the input folder)
    #[arg(short, long)]
    output: Option<Utf8PathBuf>,

    /// Replace the original replays instead of writing copies
    #[arg(long)]
    replace: bool,

    /// Delete the microphone track after a successful merge (with --replace)
    #[arg(long)]
    delete_mic: bool,

    /// Remove previously merged replays from the output folder first
    #[arg(long)]
    clean_output: bool,

    /// Open the output folder when done
    #[arg(long)]
    open: bool,

    /// Directory holding ReplayMerger.yaml
    #[arg(long, default_value = "ReplayMerger Data")]
    config_dir: Utf8PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log to the log file only
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn options(&self) -> ProcessingOptions {
        ProcessingOptions {
            replace_source: self.replace,
            delete_microphone_track_after_merge: self.delete_mic,
            clean_output_folder_first: self.clean_output,
            open_output_afterwards: self.open,
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let config = config_manager.load_engine_config()?;

    let log_dir = Utf8PathBuf::from(&config.log_dir);
    let _log_guard = setup_logging(&LogSettings {
        log_dir: &log_dir,
        log_prefix: "replay-merger",
        debug_mode: args.debug || config.debug_mode,
        console_output: !args.quiet,
    })?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("replay-merger-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    let code = runtime.block_on(run_batch(&args, &config))?;

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    Ok(code)
}

async fn run_batch(args: &Args, config: &EngineConfig) -> Result<ExitCode> {
    let muxer = FfmpegMuxer::new(config.ffmpeg_path.as_str());
    match muxer.probe_version().await {
        Ok(version) => tracing::info!("Using ffmpeg {} ({})", version, muxer.binary()),
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("ffmpeg is required to merge replays: {}", e);
            return Ok(ExitCode::from(2));
        }
    }

    let session = match prepare_session(
        &args.input,
        args.output.as_deref(),
        args.options(),
        config,
        &DiskSpaceGuard::system(),
    ) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e);
            return Ok(ExitCode::from(2));
        }
    };

    let orchestrator = ProcessingOrchestrator::new(ReplayProcessor::new(muxer))
        .with_cancel_grace(config.cancel_grace())
        .with_completion_hook(SystemOpener);

    let handle = orchestrator.run(session, |status: &JobStatus| println!("{}", status));

    let canceller = handle.canceller();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, press Ctrl-C again to stop running replays");
        canceller.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.force();
        }
    });

    let summary = handle.wait().await.context("Completion watcher failed")?;
    ctrl_c.abort();

    println!("{}", summary);

    if summary.cancelled || summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
