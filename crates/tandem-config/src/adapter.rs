use std::{path::PathBuf, time::Duration};

use crate::{
    model::{Launcher, ProbePolicy, Readiness},
    raw::{RawLauncher, RawReadiness, RawStrategy},
    ConfigError,
};

impl TryFrom<RawLauncher> for Launcher {
    type Error = ConfigError;

    fn try_from(raw: RawLauncher) -> Result<Self, Self::Error> {
        let defaults = Launcher::default();

        let launcher = Launcher {
            python: raw.python.unwrap_or(defaults.python),
            workdir: raw.workdir.map_or(defaults.workdir, PathBuf::from),
            grace_period: raw
                .grace_period_secs
                .map_or(defaults.grace_period, Duration::from_secs),
            stop_timeout: raw
                .stop_timeout_ms
                .map_or(defaults.stop_timeout, Duration::from_millis),
            readiness: raw
                .readiness
                .map_or(defaults.readiness, RawReadiness::into_readiness),
        };

        launcher.validate()?;
        Ok(launcher)
    }
}

impl RawReadiness {
    fn into_readiness(self) -> Readiness {
        match self.strategy.unwrap_or(RawStrategy::Probe) {
            RawStrategy::Fixed => Readiness::Fixed,
            RawStrategy::Probe => {
                let defaults = ProbePolicy::default();
                Readiness::Probe(ProbePolicy {
                    attempts: self.attempts.unwrap_or(defaults.attempts),
                    initial_backoff: self
                        .initial_backoff_ms
                        .map_or(defaults.initial_backoff, Duration::from_millis),
                    max_backoff: self
                        .max_backoff_ms
                        .map_or(defaults.max_backoff, Duration::from_millis),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_raw_uses_defaults() {
        let launcher = Launcher::try_from(RawLauncher::default()).unwrap();
        assert_eq!(launcher, Launcher::default());
    }

    #[test]
    fn test_raw_to_launcher_success() {
        let raw = RawLauncher {
            python: Some("/opt/venv/bin/python".to_owned()),
            workdir: Some("/srv/app".to_owned()),
            grace_period_secs: Some(5),
            stop_timeout_ms: Some(250),
            readiness: Some(RawReadiness {
                strategy: Some(RawStrategy::Probe),
                attempts: Some(3),
                initial_backoff_ms: Some(50),
                max_backoff_ms: None,
            }),
        };

        let expected = Launcher {
            python: "/opt/venv/bin/python".to_owned(),
            workdir: PathBuf::from("/srv/app"),
            grace_period: Duration::from_secs(5),
            stop_timeout: Duration::from_millis(250),
            readiness: Readiness::Probe(ProbePolicy {
                attempts: 3,
                initial_backoff: Duration::from_millis(50),
                max_backoff: Duration::from_secs(1),
            }),
        };

        assert_eq!(Launcher::try_from(raw).unwrap(), expected);
    }

    #[test]
    fn test_fixed_strategy_ignores_probe_fields() {
        let raw = RawLauncher {
            readiness: Some(RawReadiness {
                strategy: Some(RawStrategy::Fixed),
                attempts: Some(0),
                initial_backoff_ms: None,
                max_backoff_ms: None,
            }),
            ..RawLauncher::default()
        };
        assert_eq!(Launcher::try_from(raw).unwrap().readiness, Readiness::Fixed);
    }

    #[test]
    fn test_invalid_values() {
        {
            let raw = RawLauncher {
                python: Some("  ".to_owned()),
                ..RawLauncher::default()
            };
            assert!(Launcher::try_from(raw).is_err());
        }
        {
            let raw = RawLauncher {
                stop_timeout_ms: Some(0),
                ..RawLauncher::default()
            };
            assert!(Launcher::try_from(raw).is_err());
        }
        {
            let raw = RawLauncher {
                readiness: Some(RawReadiness {
                    strategy: None,
                    attempts: Some(0),
                    initial_backoff_ms: None,
                    max_backoff_ms: None,
                }),
                ..RawLauncher::default()
            };
            assert!(Launcher::try_from(raw).is_err());
        }
        {
            let raw = RawLauncher {
                readiness: Some(RawReadiness {
                    strategy: None,
                    attempts: None,
                    initial_backoff_ms: Some(2_000),
                    max_backoff_ms: Some(1_000),
                }),
                ..RawLauncher::default()
            };
            assert!(Launcher::try_from(raw).is_err());
        }
    }
}
