use crate::process_manager::ProcId;

pub type Result<R, E = Error> = std::result::Result<R, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("empty command for service `{0}`")]
    EmptyCommand(String),
    #[error("unknown process id {0:?}")]
    UnknownProcess(ProcId),
    #[error("process {0:?} has already exited")]
    AlreadyExited(ProcId),
}

/// A service that never reached the running state, or whose process could
/// no longer be observed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{service} failed to start: {reason}")]
pub struct LaunchError {
    pub service: String,
    pub reason: String,
}

impl LaunchError {
    pub fn new(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            reason: reason.into(),
        }
    }
}
