mod console;
mod error;
mod process_manager;
mod readiness;
mod runner;
pub mod services;
mod shutdown;
mod supervisor;
mod types;

pub use console::{Console, ConsoleEvent, Tone};
pub use error::{Error, LaunchError, Result};
#[cfg(unix)]
pub use process_manager::UnixProcessManager;
pub use process_manager::{BoxStream, CommandSpec, ProcId, ProcessManager, Spawned};
pub use readiness::{Delay, ReadinessReport, ReadinessStrategy, TokioDelay};
pub use runner::{CommandRunner, LaunchAck, ProcessRunner, RunContext, StopSignal};
pub use services::{LaunchPlan, Link};
pub use shutdown::{CtrlC, InterruptSource, RunSignals, ShutdownCoordinator};
pub use supervisor::{BackgroundService, ExitOutcome, Phase, Supervisor};
pub use types::{Endpoint, ProcessHandle, ProcessStatus, ServiceSpec};
