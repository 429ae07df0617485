use super::ReplayId;
use std::fmt;

/// Lifecycle of the job that processes one replay.
///
/// `Queued → Running → {Succeeded, Failed, Cancelled}`, plus `Queued → Cancelled`
/// for jobs that never got to run. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Check whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match self {
            Self::Queued => matches!(next, Self::Running | Self::Cancelled),
            Self::Running => next.is_terminal(),
            Self::Succeeded | Self::Failed | Self::Cancelled => false,
        }
    }

    /// Short fixed-width tag shown in front of the file name.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Queued => "[QUEUED]",
            Self::Running => "[ RUN  ]",
            Self::Succeeded => "[  OK  ]",
            Self::Failed => "[FAILED]",
            Self::Cancelled => "[CANCEL]",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Status event delivered to listeners on job transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub id: ReplayId,
    pub file_name: String,
    pub state: JobState,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.state.tag(), self.file_name)
    }
}
