use std::{path::PathBuf, time::Duration};

use crate::ConfigError;

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Validated launcher settings.
///
/// Only the launcher itself is configurable. The backend and frontend
/// command lines are fixed apart from the interpreter used to run them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    /// Interpreter used to run `uvicorn` and `streamlit` as modules.
    pub python: String,
    /// Directory holding `app.py` and `frontend.py`; both services run here.
    pub workdir: PathBuf,
    /// Blind delay for [`Readiness::Fixed`], last-resort fallback for [`Readiness::Probe`].
    pub grace_period: Duration,
    /// How long a stopped service gets between SIGINT and SIGKILL.
    pub stop_timeout: Duration,
    pub readiness: Readiness,
}

impl Default for Launcher {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_owned(),
            workdir: PathBuf::from("."),
            grace_period: DEFAULT_GRACE_PERIOD,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            readiness: Readiness::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Fixed,
    Probe(ProbePolicy),
}

impl Default for Readiness {
    fn default() -> Self {
        Self::Probe(ProbePolicy::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Fixed,
    Probe,
}

/// Command-line values layered over the file configuration.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub python: Option<String>,
    pub workdir: Option<PathBuf>,
    pub strategy: Option<Strategy>,
    pub grace_period: Option<Duration>,
}

impl Launcher {
    /// Apply command-line overrides and validate the result.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::Validation` if the merged settings are invalid.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(python) = overrides.python {
            self.python = python;
        }
        if let Some(workdir) = overrides.workdir {
            self.workdir = workdir;
        }
        if let Some(grace_period) = overrides.grace_period {
            self.grace_period = grace_period;
        }
        match (overrides.strategy, self.readiness) {
            (Some(Strategy::Fixed), _) => self.readiness = Readiness::Fixed,
            (Some(Strategy::Probe), Readiness::Fixed) => {
                self.readiness = Readiness::Probe(ProbePolicy::default());
            }
            _ => {}
        }

        self.validate()?;
        Ok(self)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.python.trim().is_empty() {
            return Err(ConfigError::Validation("python: must not be empty".into()));
        }
        if self.stop_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "stop_timeout_ms: must be greater than zero".into(),
            ));
        }
        if let Readiness::Probe(policy) = self.readiness {
            if policy.attempts == 0 {
                return Err(ConfigError::Validation(
                    "readiness.attempts: must be greater than zero".into(),
                ));
            }
            if policy.initial_backoff > policy.max_backoff {
                return Err(ConfigError::Validation(
                    "readiness: initial_backoff_ms exceeds max_backoff_ms".into(),
                ));
            }
        }
        Ok(())
    }
}
