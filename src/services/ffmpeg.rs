use super::processor::ProcessingError;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::future::Future;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Number of trailing stderr lines kept in a failure message.
const STDERR_TAIL_LINES: usize = 5;

/// Combines a replay video and its microphone track into one container.
///
/// The production implementation is [`FfmpegMuxer`]; tests substitute an
/// in-process fake.
pub trait Muxer: Send + Sync + 'static {
    /// Write `video` and `audio` as two stream sets into `output` without re-encoding.
    ///
    /// Must only resolve once the output is complete or the attempt has failed.
    fn mux(
        &self,
        video: &Utf8Path,
        audio: &Utf8Path,
        output: &Utf8Path,
    ) -> impl Future<Output = Result<(), ProcessingError>> + Send;
}

/// Runs the external `ffmpeg` binary in stream-copy mode.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    binary: Utf8PathBuf,

    /// Matches the first line of `ffmpeg -version`, e.g. "ffmpeg version 6.1.1 Copyright ..."
    version_pattern: Regex,
}

impl FfmpegMuxer {
    pub fn new(binary: impl Into<Utf8PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            version_pattern: Regex::new(r"^ffmpeg version (\S+)")
                .expect("Invalid version regex"),
        }
    }

    pub fn binary(&self) -> &Utf8Path {
        &self.binary
    }

    /// Build the argument list for a stream-copy mux.
    ///
    /// Both inputs are mapped completely, prompts are disabled and an existing
    /// output is overwritten. The output path is always the last argument.
    pub fn build_args(video: &Utf8Path, audio: &Utf8Path, output: &Utf8Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            video.to_string(),
            "-i".to_string(),
            audio.to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-map".to_string(),
            "1".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            output.to_string(),
        ]
    }

    /// Extract the version string from `ffmpeg -version` output.
    pub fn parse_version(&self, output: &str) -> Option<String> {
        let first_line = output.lines().next()?;
        self.version_pattern
            .captures(first_line)
            .map(|caps| caps[1].to_string())
    }

    /// Check that the tool can be launched and report its version.
    pub async fn probe_version(&self) -> Result<String, ProcessingError> {
        let output = Command::new(self.binary.as_std_path())
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ProcessingError::ToolUnavailable {
                tool: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessingError::MuxFailed {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = self
            .parse_version(&stdout)
            .unwrap_or_else(|| stdout.lines().next().unwrap_or_default().to_string());

        tracing::info!("Found {} version {}", self.binary, version);
        Ok(version)
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Muxer for FfmpegMuxer {
    async fn mux(
        &self,
        video: &Utf8Path,
        audio: &Utf8Path,
        output: &Utf8Path,
    ) -> Result<(), ProcessingError> {
        let args = Self::build_args(video, audio, output);
        tracing::debug!("Executing: {} {}", self.binary, args.join(" "));

        let start = Instant::now();

        // Killed if the owning job is aborted after the cancellation grace period
        let result = Command::new(self.binary.as_std_path())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProcessingError::ToolUnavailable {
                tool: self.binary.clone(),
                source,
            })?;

        tracing::debug!(
            "{} finished in {:.2}s with {}",
            self.binary,
            start.elapsed().as_secs_f32(),
            result.status
        );

        if result.status.success() {
            Ok(())
        } else {
            Err(ProcessingError::MuxFailed {
                code: result.status.code(),
                stderr: stderr_tail(&result.stderr),
            })
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
