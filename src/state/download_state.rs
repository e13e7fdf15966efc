/// Download state definitions for tracking a media fetch
///
/// This module defines all possible states a download task can be in.
use std::fmt;

/// Represents the current state of a download task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadState {
    /// Task created, waiting for an admission slot
    Pending,

    /// Task holds a slot and is fetching
    Running,

    /// File is on disk, either fetched now or already present
    Succeeded,

    /// Every attempt failed; no file was left behind
    Failed,
}

impl DownloadState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// Pending -> Running -> (Succeeded | Failed). A task that finds its
    /// file already on disk may go straight from Running to Succeeded.
    pub fn can_transition_to(&self, next: DownloadState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
