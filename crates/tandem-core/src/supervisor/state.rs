use std::path::PathBuf;

use crate::{error::LaunchError, types::ProcessStatus};

/// Phases of one supervisor run. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Idle,
    BackendStarting,
    Ready,
    FrontendRunning,
    ShuttingDown,
    Stopped,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The frontend exited with status 0.
    Completed,
    MissingFile(PathBuf),
    FrontendExited { code: i32 },
    FrontendLaunchFailed(LaunchError),
    Interrupted,
}

impl ExitOutcome {
    /// Outcome of a run whose frontend reached `status`.
    #[must_use]
    pub fn from_frontend(status: &ProcessStatus) -> Self {
        match status {
            ProcessStatus::Exited(0) => Self::Completed,
            ProcessStatus::Exited(code) => Self::FrontendExited { code: *code },
            ProcessStatus::Failed(error) => Self::FrontendLaunchFailed(error.clone()),
            ProcessStatus::Interrupted => Self::Interrupted,
            ProcessStatus::NotStarted | ProcessStatus::Running => {
                tracing::warn!("Frontend runner returned without a terminal status: {status:?}");
                Self::Completed
            }
        }
    }

    /// Process exit code for the launcher itself.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::FrontendExited { .. } | Self::FrontendLaunchFailed(_) => 1,
            Self::MissingFile(_) => 2,
            Self::Interrupted => 130,
        }
    }
}
