use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    console::{Console, Tone},
    supervisor::BackgroundService,
    types::ProcessHandle,
};

/// Extra time granted on top of the runner's own SIGINT to SIGKILL window.
const JOIN_MARGIN: Duration = Duration::from_secs(2);
const FORCED_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait::async_trait]
pub trait InterruptSource: Send + Sync + 'static {
    /// Resolves on the next operator interrupt.
    async fn interrupted(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CtrlC;

#[async_trait::async_trait]
impl InterruptSource for CtrlC {
    async fn interrupted(&self) {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    }
}

/// Tokens cancelled by the first and the second interrupt of one run.
#[derive(Debug, Clone, Default)]
pub struct RunSignals {
    pub interrupt: CancellationToken,
    pub force: CancellationToken,
}

/// Turns operator interrupts into stop requests and makes sure the backend
/// is stopped and joined when a run ends.
#[derive(Debug)]
pub struct ShutdownCoordinator<I> {
    source: Arc<I>,
    console: Console,
    join_timeout: Duration,
    listener: Option<JoinHandle<()>>,
}

impl<I: InterruptSource> ShutdownCoordinator<I> {
    pub fn new(source: I, console: Console, join_timeout: Duration) -> Self {
        Self {
            source: Arc::new(source),
            console,
            join_timeout,
            listener: None,
        }
    }

    /// Join timeout matching a runner that waits `stop_timeout` before SIGKILL.
    #[must_use]
    pub fn join_timeout_for(stop_timeout: Duration) -> Duration {
        stop_timeout + JOIN_MARGIN
    }

    /// Start listening for interrupts for one run.
    pub fn arm(&mut self) -> RunSignals {
        self.disarm();

        let signals = RunSignals::default();
        self.listener = Some(tokio::spawn(listen(
            Arc::clone(&self.source),
            signals.clone(),
        )));
        signals
    }

    pub fn disarm(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }

    /// Stop the backend and wait for its runner to finish.
    ///
    /// Returns `None` only if the runner had to be aborted or panicked.
    pub async fn stop(&self, service: BackgroundService) -> Option<ProcessHandle> {
        self.console
            .system(Tone::Info, "Shutting down both services...");

        let (name, stop, mut task) = service.into_parts();
        stop.request_stop();

        let handle = match tokio::time::timeout(self.join_timeout, &mut task).await {
            Ok(joined) => joined.map_err(|err| tracing::error!("{name} task failed: {err}")).ok(),
            Err(_) => {
                tracing::warn!(
                    "{name} still running after {:?}, forcing",
                    self.join_timeout
                );
                stop.force();
                match tokio::time::timeout(FORCED_JOIN_TIMEOUT, &mut task).await {
                    Ok(joined) => joined
                        .map_err(|err| tracing::error!("{name} task failed: {err}"))
                        .ok(),
                    Err(_) => {
                        tracing::error!("{name} did not stop, aborting its runner");
                        task.abort();
                        None
                    }
                }
            }
        };

        if handle.is_some() {
            self.console
                .system(Tone::Success, "All services stopped");
        } else {
            self.console.system(
                Tone::Warning,
                format!("Could not confirm that the {name} stopped"),
            );
        }
        handle
    }
}

impl<I> Drop for ShutdownCoordinator<I> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

async fn listen<I: InterruptSource>(source: Arc<I>, signals: RunSignals) {
    source.interrupted().await;
    tracing::info!("Interrupt received, stopping services");
    signals.interrupt.cancel();

    source.interrupted().await;
    tracing::warn!("Second interrupt, killing services");
    signals.force.cancel();
}
