//! Services module - Pure business logic for replay processing.
//!
//! This module contains the per-file logic of the replay merger. The services are
//! **framework-agnostic** and know nothing about jobs, batches or user interfaces,
//! which keeps them testable and reusable.
//!
//! # Components
//!
//! - [`discovery`]: Recursive scan of an input root for unprocessed replays
//!   (`*.mp4` containing `_replay_`, not containing `_merged`), sorted by file name.
//!
//! - [`DiskSpaceGuard`]: Pre-flight check comparing the size of a replay set with the
//!   free space of the output volume.
//!
//! - [`ReplayProcessor`]: Decides the output path for one replay and then merges it with
//!   its microphone track, copies it, or leaves it alone. Optionally replaces the source
//!   and deletes the microphone track.
//!
//! - [`FfmpegMuxer`]: The [`Muxer`] implementation that runs `ffmpeg` in stream-copy mode.
//!
//! - [`SystemOpener`]: Opens the output folder in the file manager after a batch.
//!
//! # ffmpeg Integration
//!
//! Replays are only re-muxed, never re-encoded:
//! 1. Both inputs are passed with `-i` (video first, microphone track second)
//! 2. `-nostdin -y` disables prompts and overwrites the output
//! 3. `-map 0 -map 1 -c copy` keeps every stream of both inputs as-is
//! 4. A non-zero exit code fails the replay's job

pub mod discovery;
pub mod disk_space;
pub mod ffmpeg;
pub mod opener;
pub mod processor;

pub use discovery::{discover, is_unprocessed_replay};
pub use disk_space::{AdmissionDecision, DiskSpaceGuard};
pub use ffmpeg::{FfmpegMuxer, Muxer};
pub use opener::SystemOpener;
pub use processor::{
    ProcessOutcome, ProcessingError, ReplayAction, ReplayPlan, ReplayProcessor, output_path,
};
