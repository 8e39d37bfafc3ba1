use std::time::Duration;

use futures::StreamExt;
use tokio::{sync::oneshot, task::JoinHandle};
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
use crate::process_manager::UnixProcessManager;
use crate::{
    console::{Console, Tone},
    error::LaunchError,
    process_manager::{BoxStream, ProcId, ProcessManager},
    types::{ProcessHandle, ProcessStatus, ServiceSpec},
};

const KILL_WAIT: Duration = Duration::from_secs(1);
const OUTPUT_DRAIN: Duration = Duration::from_secs(1);

/// Result of a launch attempt, reported before the runner starts waiting.
pub type LaunchAck = Result<Option<u32>, LaunchError>;

/// Two-stage stop request: `graceful` asks for SIGINT, `force` for SIGKILL.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    graceful: CancellationToken,
    force: CancellationToken,
}

impl StopSignal {
    #[must_use]
    pub fn new(graceful: CancellationToken, force: CancellationToken) -> Self {
        Self { graceful, force }
    }

    pub fn request_stop(&self) {
        self.graceful.cancel();
    }

    pub fn force(&self) {
        self.force.cancel();
    }

    pub async fn stop_requested(&self) {
        self.graceful.cancelled().await;
    }

    pub async fn force_requested(&self) {
        self.force.cancelled().await;
    }
}

/// What a [`ProcessRunner`] gets besides the service to launch.
#[derive(Debug)]
pub struct RunContext {
    console: Console,
    stop: StopSignal,
    launched: Option<oneshot::Sender<LaunchAck>>,
}

impl RunContext {
    #[must_use]
    pub fn new(console: Console, stop: StopSignal) -> (Self, oneshot::Receiver<LaunchAck>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                console,
                stop,
                launched: Some(tx),
            },
            rx,
        )
    }

    #[must_use]
    pub fn console(&self) -> &Console {
        &self.console
    }

    #[must_use]
    pub fn stop(&self) -> &StopSignal {
        &self.stop
    }

    /// Report the launch attempt to whoever is waiting on it. Only the first call counts.
    pub fn acknowledge(&mut self, ack: LaunchAck) {
        if let Some(tx) = self.launched.take() {
            // The foreground caller drops the receiver.
            let _ = tx.send(ack);
        }
    }
}

#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync + 'static {
    /// Launch `spec` and drive it to a terminal status.
    ///
    /// Returns only once the process has exited, failed to launch, or been
    /// stopped through `ctx`. Failures are reported on the console and in the
    /// returned handle, never as an error.
    async fn start(&self, spec: ServiceSpec, ctx: RunContext) -> ProcessHandle;
}

/// Runs each service through a fresh [`ProcessManager`].
#[derive(Debug, Clone)]
pub struct CommandRunner<F> {
    factory: F,
    stop_timeout: Duration,
}

impl<F> CommandRunner<F> {
    pub fn new(factory: F, stop_timeout: Duration) -> Self {
        Self {
            factory,
            stop_timeout,
        }
    }
}

#[cfg(unix)]
impl CommandRunner<fn() -> UnixProcessManager> {
    #[must_use]
    pub fn unix(stop_timeout: Duration) -> Self {
        Self::new(UnixProcessManager::new, stop_timeout)
    }
}

#[async_trait::async_trait]
impl<F, P> ProcessRunner for CommandRunner<F>
where
    F: Fn() -> P + Send + Sync + 'static,
    P: ProcessManager + 'static,
{
    async fn start(&self, spec: ServiceSpec, mut ctx: RunContext) -> ProcessHandle {
        let name = spec.name().to_owned();
        let console = ctx.console().clone();
        let mut handle = ProcessHandle::new(spec);

        console.service(
            &name,
            Tone::Info,
            format!("Starting `{}`", handle.spec().command_line()),
        );

        let mut pm = (self.factory)();
        let spawned = match pm.spawn(handle.spec().to_command()).await {
            Ok(spawned) => spawned,
            Err(err) => {
                let error = LaunchError::new(&name, err.to_string());
                tracing::error!("{error}");
                console.service(&name, Tone::Failure, format!("failed to start: {err}"));
                ctx.acknowledge(Err(error.clone()));
                handle.finish(ProcessStatus::Failed(error));
                return handle;
            }
        };

        tracing::info!("Service {name:?} running with pid {:?}", spawned.pid);
        handle.set_running(spawned.pid);
        ctx.acknowledge(Ok(spawned.pid));

        let forwarders = [
            tokio::spawn(follow_output(spawned.stdout, name.clone(), console.clone())),
            tokio::spawn(follow_output(spawned.stderr, name.clone(), console.clone())),
        ];

        let exited = tokio::select! {
            biased;
            result = pm.wait_exit(spawned.id) => Some(result),
            () = ctx.stop().stop_requested() => None,
        };

        let status = match exited {
            Some(Ok(0)) => {
                console.service(&name, Tone::Success, "exited");
                ProcessStatus::Exited(0)
            }
            Some(Ok(code)) => {
                console.service(&name, Tone::Failure, format!("exited with status {code}"));
                ProcessStatus::Exited(code)
            }
            Some(Err(err)) => {
                console.service(&name, Tone::Failure, format!("lost track of process: {err}"));
                ProcessStatus::Failed(LaunchError::new(&name, err.to_string()))
            }
            None => {
                let killed = self
                    .stop_process(&mut pm, spawned.id, ctx.stop(), &name)
                    .await;
                if killed {
                    console.service(
                        &name,
                        Tone::Interrupted,
                        format!("stopped (killed after {:?})", self.stop_timeout),
                    );
                } else {
                    console.service(&name, Tone::Interrupted, "stopped");
                }
                ProcessStatus::Interrupted
            }
        };
        handle.finish(status);

        drain(forwarders).await;
        handle
    }
}

impl<F> CommandRunner<F> {
    /// SIGINT, bounded wait, then SIGKILL. Returns `true` if SIGKILL was needed.
    async fn stop_process<P: ProcessManager>(
        &self,
        pm: &mut P,
        id: ProcId,
        stop: &StopSignal,
        name: &str,
    ) -> bool {
        if let Err(err) = pm.shutdown(id).await {
            tracing::debug!("Cannot interrupt {name:?}: {err}");
        }

        let graceful = tokio::select! {
            result = pm.wait(id, self.stop_timeout) => result.ok().flatten(),
            () = stop.force_requested() => None,
        };
        if let Some(code) = graceful {
            tracing::info!("Service {name:?} stopped with status {code}");
            return false;
        }

        tracing::warn!("Service {name:?} still running, sending SIGKILL");
        if let Err(err) = pm.kill(id).await {
            tracing::debug!("Cannot kill {name:?}: {err}");
        }
        match pm.wait(id, KILL_WAIT).await {
            Ok(Some(code)) => tracing::info!("Service {name:?} killed with status {code}"),
            Ok(None) => tracing::error!("Service {name:?} survived SIGKILL"),
            Err(err) => tracing::debug!("Cannot reap {name:?}: {err}"),
        }
        true
    }
}

async fn follow_output(mut output: BoxStream<String>, service_name: String, console: Console) {
    while let Some(line) = output.next().await {
        console.output(&service_name, line);
    }
}

/// Output ends when the process group closes its pipes; a descendant that
/// escaped the group could hold them open, so the wait is bounded.
async fn drain(forwarders: [JoinHandle<()>; 2]) {
    for mut task in forwarders {
        if tokio::time::timeout(OUTPUT_DRAIN, &mut task).await.is_err() {
            tracing::debug!("Output still open after {OUTPUT_DRAIN:?}, detaching");
            task.abort();
        }
    }
}
