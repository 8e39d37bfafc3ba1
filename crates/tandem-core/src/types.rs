use std::{fmt, path::PathBuf};

use crate::{error::LaunchError, process_manager::CommandSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, suitable for connecting a socket.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn url_with_path(&self, path: &str) -> String {
        format!("{}/{}", self.url(), path.trim_start_matches('/'))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Everything needed to launch one service. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    name: String,
    command: Vec<String>,
    required_file: PathBuf,
    workdir: PathBuf,
    endpoint: Endpoint,
}

impl ServiceSpec {
    pub fn new(
        name: impl Into<String>,
        command: Vec<String>,
        required_file: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
        endpoint: Endpoint,
    ) -> Self {
        Self {
            name: name.into(),
            command,
            required_file: required_file.into(),
            workdir: workdir.into(),
            endpoint,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The required file, resolved against the working directory.
    #[must_use]
    pub fn required_path(&self) -> PathBuf {
        self.workdir.join(&self.required_file)
    }

    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    pub(crate) fn to_command(&self) -> CommandSpec {
        CommandSpec {
            name: self.name.clone(),
            cmd: self.command.clone(),
            cwd: Some(self.workdir.clone()),
            env: vec![("PYTHONUNBUFFERED".to_owned(), "1".to_owned())],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    NotStarted,
    Running,
    Exited(i32),
    Failed(LaunchError),
    Interrupted,
}

impl ProcessStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NotStarted | Self::Running)
    }
}

/// One launch of a [`ServiceSpec`], as observed by the runner that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    spec: ServiceSpec,
    pid: Option<u32>,
    status: ProcessStatus,
}

impl ProcessHandle {
    #[must_use]
    pub fn new(spec: ServiceSpec) -> Self {
        Self {
            spec,
            pid: None,
            status: ProcessStatus::NotStarted,
        }
    }

    #[must_use]
    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub fn status(&self) -> &ProcessStatus {
        &self.status
    }

    pub fn set_running(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.status = ProcessStatus::Running;
    }

    pub fn finish(&mut self, status: ProcessStatus) {
        debug_assert!(status.is_terminal(), "finish() needs a terminal status");
        self.status = status;
    }
}
