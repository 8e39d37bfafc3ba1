use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tandem_config::{ConfigError, Launcher, Overrides, Strategy};

/// CLI for tandem
#[derive(Parser, Debug)]
#[command(
    name = "tandem",
    version,
    about = "Start a backend API and a frontend UI together, stop both on Ctrl+C",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub launch: LaunchArgs,
}

impl Cli {
    /// The requested command, `run` when none was given.
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Run(self.launch))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the backend, wait for it, then start the frontend
    Run(LaunchArgs),
    /// Validate the configuration and show what would be started
    Check(LaunchArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct LaunchArgs {
    /// File path to the configuration file (TOML)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Directory holding app.py and frontend.py
    #[arg(short = 'C', long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Python interpreter used to run uvicorn and streamlit
    #[arg(long, value_name = "BIN")]
    pub python: Option<String>,

    /// How to decide that the backend is up
    #[arg(long, value_enum)]
    pub readiness: Option<ReadinessArg>,

    /// Delay before the frontend starts (fixed), or fallback delay (probe)
    #[arg(long, value_name = "SECS")]
    pub grace_period: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessArg {
    Fixed,
    Probe,
}

impl From<ReadinessArg> for Strategy {
    fn from(arg: ReadinessArg) -> Self {
        match arg {
            ReadinessArg::Fixed => Self::Fixed,
            ReadinessArg::Probe => Self::Probe,
        }
    }
}

impl LaunchArgs {
    /// Built-in defaults, then the configuration file, then these flags.
    ///
    /// The configuration file is looked up in `--dir` when given.
    pub fn launcher(&self) -> Result<Launcher, ConfigError> {
        let search_dir = self.dir.as_deref().unwrap_or_else(|| Path::new("."));
        let launcher = tandem_config::load(self.file.as_deref(), search_dir)?;
        tracing::debug!("Loaded launcher settings: {launcher:?}");

        launcher.with_overrides(Overrides {
            python: self.python.clone(),
            workdir: self.dir.clone(),
            strategy: self.readiness.map(Strategy::from),
            grace_period: self.grace_period.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use tandem_config::Readiness;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tandem").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_run_is_the_default_command() {
        let Commands::Run(args) = parse(&["--python", "python3.12"]).into_command() else {
            panic!("expected run");
        };
        assert_eq!(args.python.as_deref(), Some("python3.12"));
    }

    #[test]
    fn test_check_with_flags() {
        let cli = parse(&[
            "check",
            "-C",
            "/srv/app",
            "--readiness",
            "fixed",
            "--grace-period",
            "5",
            "-vv",
        ]);

        assert_eq!(cli.verbose, 2);
        let Commands::Check(args) = cli.into_command() else {
            panic!("expected check");
        };
        assert_eq!(args.dir, Some(PathBuf::from("/srv/app")));
        assert_eq!(args.readiness, Some(ReadinessArg::Fixed));
        assert_eq!(args.grace_period, Some(5));
    }

    #[test]
    fn test_unknown_readiness_is_rejected() {
        assert!(Cli::try_parse_from(["tandem", "run", "--readiness", "http"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tandem.toml"),
            "python = \"/opt/venv/bin/python\"\ngrace_period_secs = 10\n\n[readiness]\nstrategy = \"probe\"\nattempts = 3\n",
        )
        .unwrap();

        let args = LaunchArgs {
            dir: Some(dir.path().to_path_buf()),
            grace_period: Some(1),
            ..LaunchArgs::default()
        };
        let launcher = args.launcher().unwrap();

        assert_eq!(launcher.python, "/opt/venv/bin/python");
        assert_eq!(launcher.workdir, dir.path());
        assert_eq!(launcher.grace_period, Duration::from_secs(1));
        assert!(matches!(launcher.readiness, Readiness::Probe(policy) if policy.attempts == 3));

        let fixed = LaunchArgs {
            readiness: Some(ReadinessArg::Fixed),
            ..args
        };
        assert_eq!(fixed.launcher().unwrap().readiness, Readiness::Fixed);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let args = LaunchArgs {
            file: Some(dir.path().join("missing.toml")),
            ..LaunchArgs::default()
        };
        assert!(matches!(args.launcher(), Err(ConfigError::Io(_))));
    }
}
