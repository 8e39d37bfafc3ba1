use std::{process::ExitCode, time::Duration};

use anyhow::Result;
use tandem_core::{
    CommandRunner, Console, CtrlC, LaunchPlan, ReadinessStrategy, ShutdownCoordinator, Supervisor,
    TokioDelay,
};

use crate::{config::LaunchArgs, logger::Logger};

const PRINTER_DRAIN: Duration = Duration::from_secs(1);

pub async fn run(args: &LaunchArgs) -> Result<ExitCode> {
    let launcher = args.launcher()?;
    let plan = LaunchPlan::from_launcher(&launcher);
    let readiness = ReadinessStrategy::from_launcher(&launcher, plan.backend.endpoint());

    let (console, mut events) = Console::channel();
    let printer = tokio::spawn(async move {
        let mut logger = Logger::default();
        while let Some(event) = events.recv().await {
            logger.render(&event);
        }
    });

    let coordinator = ShutdownCoordinator::new(
        CtrlC,
        console.clone(),
        ShutdownCoordinator::<CtrlC>::join_timeout_for(launcher.stop_timeout),
    );
    let mut supervisor = Supervisor::new(
        plan,
        readiness,
        CommandRunner::unix(launcher.stop_timeout),
        TokioDelay,
        coordinator,
        console,
    );

    let outcome = supervisor.run().await;
    tracing::info!("Run finished: {outcome:?}");

    // The printer ends once the last console handle is gone.
    drop(supervisor);
    match tokio::time::timeout(PRINTER_DRAIN, printer).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!("Console printer failed: {err}"),
        Err(_) => tracing::warn!("Console output still pending after {PRINTER_DRAIN:?}"),
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
