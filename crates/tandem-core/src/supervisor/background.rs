use std::sync::Arc;

use tokio::{sync::oneshot, task::JoinHandle};

use crate::{
    console::Console,
    runner::{LaunchAck, ProcessRunner, RunContext, StopSignal},
    types::{ProcessHandle, ServiceSpec},
};

/// A service whose runner lives on its own task.
///
/// The supervisor never detaches it: the task is handed to the
/// [`ShutdownCoordinator`](crate::ShutdownCoordinator), which stops and joins it.
#[derive(Debug)]
pub struct BackgroundService {
    name: String,
    stop: StopSignal,
    task: JoinHandle<ProcessHandle>,
}

impl BackgroundService {
    pub fn spawn<R: ProcessRunner>(
        runner: Arc<R>,
        spec: ServiceSpec,
        console: Console,
        stop: StopSignal,
    ) -> (Self, oneshot::Receiver<LaunchAck>) {
        let name = spec.name().to_owned();
        let (ctx, launched) = RunContext::new(console, stop.clone());

        tracing::debug!("Spawning background runner for {name:?}");
        let task = tokio::spawn(async move { runner.start(spec, ctx).await });

        (Self { name, stop, task }, launched)
    }

    /// `true` once the runner returned, whatever the outcome.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub(crate) fn into_parts(self) -> (String, StopSignal, JoinHandle<ProcessHandle>) {
        (self.name, self.stop, self.task)
    }
}
