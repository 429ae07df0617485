//! Data models for the replay merger.
//!
//! This module contains the core data structures shared by the services and the orchestrator:
//! - [`ReplayFile`]: An immutable reference to one discovered replay, keyed by [`ReplayId`]
//! - [`ProcessingOptions`]: The user's choices for a single batch run
//! - [`ProcessingSession`]: Input root, output folder, replay list and options for one run
//! - [`JobState`] / [`JobStatus`]: Per-replay job lifecycle and the events emitted for it
//! - [`EngineConfig`]: Engine settings loaded from `ReplayMerger.yaml`
//!
//! # Architecture Note
//!
//! The models are plain values. Mutable job state lives in
//! [`JobRegistry`](crate::state::JobRegistry); everything here is either
//! immutable for the duration of a run or a snapshot.

pub mod config;
pub mod job;
pub mod replay;
pub mod session;

pub use config::{EngineConfig, ProcessingOptions};
pub use job::{JobState, JobStatus};
pub use replay::{
    AUDIO_EXTENSION, CONTAINER_EXTENSION, MERGED_MARKER, REPLAY_MARKER, ReplayFile, ReplayId,
    STAGING_SUFFIX,
};
pub use session::ProcessingSession;
