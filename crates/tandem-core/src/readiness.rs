//! Gate between launching the backend and launching the frontend.

use std::time::Duration;

use tandem_config::{Launcher, ProbePolicy, Readiness};
use tokio::net::TcpStream;

use crate::{
    console::{Console, Tone},
    types::Endpoint,
};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

#[async_trait::async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait::async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessStrategy {
    /// Blind delay.
    Fixed { grace: Duration },
    /// Poll a TCP connect to `address`, sleeping `fallback` once if it never answers.
    Probe {
        address: String,
        policy: ProbePolicy,
        fallback: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessReport {
    /// The fixed delay ran out.
    Elapsed,
    Ready { attempts: u32 },
    /// Every probe failed; the fallback delay ran out.
    Unconfirmed,
    BackendExited,
}

impl ReadinessStrategy {
    #[must_use]
    pub fn from_launcher(launcher: &Launcher, backend: &Endpoint) -> Self {
        match launcher.readiness {
            Readiness::Fixed => Self::Fixed {
                grace: launcher.grace_period,
            },
            Readiness::Probe(policy) => Self::Probe {
                address: backend.address(),
                policy,
                fallback: launcher.grace_period,
            },
        }
    }

    /// Wait until the backend is worth starting the frontend against.
    ///
    /// `backend_alive` is checked before every probe so a backend that already
    /// exited does not hold the frontend back.
    pub async fn wait<D, A>(&self, delay: &D, console: &Console, backend_alive: A) -> ReadinessReport
    where
        D: Delay + ?Sized,
        A: Fn() -> bool + Send + Sync,
    {
        match self {
            Self::Fixed { grace } => {
                console.system(Tone::Info, "Waiting for backend to initialize...");
                delay.sleep(*grace).await;
                ReadinessReport::Elapsed
            }
            Self::Probe {
                address,
                policy,
                fallback,
            } => {
                console.system(
                    Tone::Info,
                    format!("Waiting for backend to accept connections on {address}..."),
                );

                let mut backoff = policy.initial_backoff;
                for attempt in 1..=policy.attempts {
                    if !backend_alive() {
                        console.system(
                            Tone::Warning,
                            "Backend exited before accepting connections",
                        );
                        return ReadinessReport::BackendExited;
                    }
                    if probe(address).await {
                        tracing::info!("Backend reachable at {address} after {attempt} attempt(s)");
                        console.system(Tone::Success, "Backend is accepting connections");
                        return ReadinessReport::Ready { attempts: attempt };
                    }

                    if attempt == policy.attempts {
                        break;
                    }
                    tracing::debug!("Backend not reachable at {address} (attempt {attempt}), retrying in {backoff:?}");
                    delay.sleep(backoff).await;
                    backoff = (backoff * 2).min(policy.max_backoff);
                }

                console.system(
                    Tone::Warning,
                    format!(
                        "Backend not reachable at {address} after {} attempts, waiting {fallback:?} before starting the frontend",
                        policy.attempts
                    ),
                );
                delay.sleep(*fallback).await;
                ReadinessReport::Unconfirmed
            }
        }
    }
}

async fn probe(address: &str) -> bool {
    matches!(
        tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address)).await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    use tokio::net::TcpListener;

    use super::*;

    #[derive(Default)]
    struct RecordingDelay {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait::async_trait]
    impl Delay for RecordingDelay {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn probe_strategy(address: String, attempts: u32) -> ReadinessStrategy {
        ReadinessStrategy::Probe {
            address,
            policy: ProbePolicy {
                attempts,
                initial_backoff: Duration::from_millis(100),
                max_backoff: Duration::from_millis(300),
            },
            fallback: Duration::from_secs(3),
        }
    }

    /// An address nothing listens on: bind, remember the port, close.
    async fn closed_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        address
    }

    #[tokio::test]
    async fn test_fixed_sleeps_grace_period() {
        let delay = RecordingDelay::default();
        let (console, _rx) = Console::channel();
        let strategy = ReadinessStrategy::Fixed {
            grace: Duration::from_secs(3),
        };

        let report = strategy.wait(&delay, &console, || true).await;

        assert_eq!(report, ReadinessReport::Elapsed);
        assert_eq!(*delay.sleeps.lock().unwrap(), vec![Duration::from_secs(3)]);
    }

    #[tokio::test]
    async fn test_probe_succeeds_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let delay = RecordingDelay::default();
        let (console, _rx) = Console::channel();

        let report = probe_strategy(address, 5)
            .wait(&delay, &console, || true)
            .await;

        assert_eq!(report, ReadinessReport::Ready { attempts: 1 });
        assert!(delay.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_probe_backs_off_then_falls_back() {
        let delay = RecordingDelay::default();
        let (console, _rx) = Console::channel();

        let report = probe_strategy(closed_address().await, 4)
            .wait(&delay, &console, || true)
            .await;

        assert_eq!(report, ReadinessReport::Unconfirmed);
        assert_eq!(
            *delay.sleeps.lock().unwrap(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_secs(3),
            ]
        );
    }

    #[tokio::test]
    async fn test_single_attempt_goes_straight_to_fallback() {
        let delay = RecordingDelay::default();
        let (console, _rx) = Console::channel();

        let report = probe_strategy(closed_address().await, 1)
            .wait(&delay, &console, || true)
            .await;

        assert_eq!(report, ReadinessReport::Unconfirmed);
        assert_eq!(*delay.sleeps.lock().unwrap(), vec![Duration::from_secs(3)]);
    }

    #[tokio::test]
    async fn test_probe_stops_when_backend_exits() {
        let delay = RecordingDelay::default();
        let (console, _rx) = Console::channel();
        let alive = AtomicBool::new(true);

        let report = probe_strategy(closed_address().await, 10)
            .wait(&delay, &console, || alive.swap(false, Ordering::SeqCst))
            .await;

        assert_eq!(report, ReadinessReport::BackendExited);
        assert_eq!(delay.sleeps.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_strategy_from_launcher() {
        let backend = Endpoint::new("127.0.0.1", 8000);
        let fixed = Launcher {
            readiness: Readiness::Fixed,
            ..Launcher::default()
        };
        assert_eq!(
            ReadinessStrategy::from_launcher(&fixed, &backend),
            ReadinessStrategy::Fixed {
                grace: Duration::from_secs(3)
            }
        );

        let probe = ReadinessStrategy::from_launcher(&Launcher::default(), &backend);
        assert!(matches!(
            probe,
            ReadinessStrategy::Probe { ref address, fallback, .. }
                if address == "127.0.0.1:8000" && fallback == Duration::from_secs(3)
        ));
    }
}
