use std::{io::Write, process::ExitCode};

use anyhow::Result;
use tandem_core::{ConsoleEvent, ExitOutcome, LaunchPlan, Tone};

use crate::{config::LaunchArgs, logger::Logger};

pub fn check(args: &LaunchArgs) -> Result<ExitCode> {
    let launcher = args.launcher()?;
    let plan = LaunchPlan::from_launcher(&launcher);

    let mut logger = Logger::default();
    Ok(ExitCode::from(report(&plan, &mut logger)))
}

/// Print what a run would start. Returns the exit code of the check.
fn report<W: Write>(plan: &LaunchPlan, logger: &mut Logger<W>) -> u8 {
    for service in [&plan.backend, &plan.frontend] {
        let path = service.required_path();
        let (tone, state) = if path.is_file() {
            (Tone::Success, "found")
        } else {
            (Tone::Failure, "missing")
        };

        logger.render(&ConsoleEvent::Service {
            service: service.name().to_owned(),
            tone: Tone::Info,
            message: service.command_line(),
        });
        logger.render(&ConsoleEvent::Service {
            service: service.name().to_owned(),
            tone,
            message: format!("{} {state}", path.display()),
        });
    }
    logger.render(&ConsoleEvent::Endpoints(plan.endpoints()));

    match plan.missing_file() {
        Some(path) => ExitOutcome::MissingFile(path).exit_code(),
        None => ExitOutcome::Completed.exit_code(),
    }
}
