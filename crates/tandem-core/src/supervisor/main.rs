use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    console::{Console, Tone},
    readiness::{Delay, ReadinessStrategy},
    runner::{ProcessRunner, RunContext, StopSignal},
    services::LaunchPlan,
    shutdown::{InterruptSource, RunSignals, ShutdownCoordinator},
    supervisor::{
        background::BackgroundService,
        state::{ExitOutcome, Phase},
    },
};

const BANNER_WIDTH: usize = 60;

/// Starts the backend in the background, gates on its readiness, then runs
/// the frontend in the foreground until it exits or the operator interrupts.
#[derive(Debug)]
pub struct Supervisor<R, D, I> {
    plan: LaunchPlan,
    readiness: ReadinessStrategy,
    runner: Arc<R>,
    delay: D,
    coordinator: ShutdownCoordinator<I>,
    console: Console,

    phase: Phase,
    history: Vec<Phase>,
}

impl<R, D, I> Supervisor<R, D, I>
where
    R: ProcessRunner,
    D: Delay,
    I: InterruptSource,
{
    pub fn new(
        plan: LaunchPlan,
        readiness: ReadinessStrategy,
        runner: R,
        delay: D,
        coordinator: ShutdownCoordinator<I>,
        console: Console,
    ) -> Self {
        Self {
            plan,
            readiness,
            runner: Arc::new(runner),
            delay,
            coordinator,
            console,
            phase: Phase::Idle,
            history: vec![Phase::Idle],
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Phases entered during the last run, starting with [`Phase::Idle`].
    #[must_use]
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    /// Run both services to completion.
    ///
    /// Can be called again once it returned; every call starts from [`Phase::Idle`].
    pub async fn run(&mut self) -> ExitOutcome {
        self.phase = Phase::Idle;
        self.history = vec![Phase::Idle];

        if let Some(path) = self.plan.missing_file() {
            self.console.system(
                Tone::Failure,
                format!("Error: {} not found!", path.display()),
            );
            self.enter(Phase::Stopped);
            return ExitOutcome::MissingFile(path);
        }

        self.banner();
        let signals = self.coordinator.arm();

        self.enter(Phase::BackendStarting);
        let backend = self.launch_backend(&signals.force).await;

        let gate = tokio::select! {
            report = self.readiness.wait(&self.delay, &self.console, || !backend.is_finished()) => Some(report),
            () = signals.interrupt.cancelled() => None,
        };

        let outcome = match gate {
            Some(report) => {
                tracing::info!("Readiness gate passed: {report:?}");
                self.enter(Phase::Ready);
                self.announce_endpoints();

                self.enter(Phase::FrontendRunning);
                self.run_frontend(&signals).await
            }
            None => {
                self.console.system(
                    Tone::Interrupted,
                    "Interrupted before the frontend was started",
                );
                ExitOutcome::Interrupted
            }
        };

        self.enter(Phase::ShuttingDown);
        if let Some(handle) = self.coordinator.stop(backend).await {
            tracing::info!("Backend finished with {:?}", handle.status());
        }
        self.coordinator.disarm();

        self.enter(Phase::Stopped);
        outcome
    }

    fn enter(&mut self, phase: Phase) {
        debug_assert!(phase > self.phase, "phase moved from {:?} to {phase:?}", self.phase);
        tracing::debug!("Supervisor phase {:?} -> {phase:?}", self.phase);
        self.phase = phase;
        self.history.push(phase);
    }

    fn banner(&self) {
        let rule = "=".repeat(BANNER_WIDTH);
        self.console.plain(rule.as_str());
        self.console.plain("Tandem: API backend + UI frontend");
        self.console.plain(rule.as_str());
        self.console.plain(format!(
            "Starting {} and {}...",
            self.plan.backend.name(),
            self.plan.frontend.name()
        ));
        self.console.plain("");
    }

    async fn launch_backend(&self, force: &CancellationToken) -> BackgroundService {
        let stop = StopSignal::new(CancellationToken::new(), force.clone());
        let (backend, launched) = BackgroundService::spawn(
            Arc::clone(&self.runner),
            self.plan.backend.clone(),
            self.console.clone(),
            stop,
        );

        match launched.await {
            Ok(Ok(pid)) => tracing::info!("Backend launched with pid {pid:?}"),
            Ok(Err(err)) => {
                tracing::warn!("{err}");
                self.console.system(
                    Tone::Warning,
                    "Continuing without a running backend",
                );
            }
            Err(_) => {
                tracing::error!("Backend runner ended without reporting its launch");
                self.console.system(
                    Tone::Warning,
                    "Continuing without a running backend",
                );
            }
        }
        backend
    }

    fn announce_endpoints(&self) {
        self.console.plain("");
        self.console.endpoints(self.plan.endpoints());
        self.console.plain("");
        self.console
            .system(Tone::Info, "Press Ctrl+C to stop both servers");
        self.console.plain("=".repeat(BANNER_WIDTH));
    }

    async fn run_frontend(&self, signals: &RunSignals) -> ExitOutcome {
        let stop = StopSignal::new(signals.interrupt.clone(), signals.force.clone());
        let (ctx, _launched) = RunContext::new(self.console.clone(), stop);

        let frontend = self.runner.start(self.plan.frontend.clone(), ctx).await;
        ExitOutcome::from_frontend(frontend.status())
    }
}
