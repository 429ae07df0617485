// Replay Merger - batch muxing of gameplay replays with their microphone tracks
//
// This is the library crate containing the processing engine and data structures.
// The binary crate (main.rs) provides a headless command line front end.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{
    EngineConfig, JobState, JobStatus, ProcessingOptions, ProcessingSession, ReplayFile, ReplayId,
};
pub use orchestrator::{
    BatchCanceller, BatchHandle, BatchSummary, CompletionHook, ProcessingOrchestrator, SessionError,
    StatusListener, prepare_session,
};
pub use state::JobRegistry;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
