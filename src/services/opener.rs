use crate::orchestrator::CompletionHook;
use camino::Utf8Path;
use std::process::{Command, Stdio};
use std::thread;

/// Opens the output folder in the platform file manager once a batch completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl SystemOpener {
    /// Program used to open folders on this platform.
    pub fn program() -> &'static str {
        if cfg!(target_os = "windows") {
            "explorer"
        } else if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        }
    }

    /// Launch the file manager on `path` without blocking on it.
    pub fn open(&self, path: &Utf8Path) -> std::io::Result<()> {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path),
            ));
        }

        let mut command = Command::new(Self::program());
        command.arg(path.as_std_path());
        spawn_reaped(command)?;
        Ok(())
    }
}

/// Start `command` and wait for it on a background thread so the child does
/// not linger as a zombie. The returned handle finishes once the child exited.
fn spawn_reaped(mut command: Command) -> std::io::Result<thread::JoinHandle<()>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    thread::Builder::new()
        .name("replay-merger-opener".to_string())
        .spawn(move || {
            if let Err(e) = child.wait() {
                tracing::debug!("Failed to wait for file manager launcher: {}", e);
            }
        })
}

impl CompletionHook for SystemOpener {
    fn on_completed(&self, output_folder: &Utf8Path) {
        tracing::info!("Opening output folder {}", output_folder);
        if let Err(e) = self.open(output_folder) {
            tracing::error!("Failed to open output folder {}: {}", output_folder, e);
        }
    }
}
