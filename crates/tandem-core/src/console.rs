//! Operator-facing output.
//!
//! Every task that wants to say something to the operator holds a [`Console`]
//! and sends [`ConsoleEvent`]s into one channel. A single consumer renders them,
//! so lines from concurrent services never tear.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::services::Link;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Failure,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// Printed as is, used for the banner.
    Plain(String),
    System {
        tone: Tone,
        message: String,
    },
    /// Status of one supervised service.
    Service {
        service: String,
        tone: Tone,
        message: String,
    },
    /// A line written by the service process itself.
    Output {
        service: String,
        line: String,
    },
    Endpoints(Vec<Link>),
}

impl ConsoleEvent {
    #[must_use]
    pub fn tone(&self) -> Option<Tone> {
        match self {
            Self::System { tone, .. } | Self::Service { tone, .. } => Some(*tone),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Console {
    tx: UnboundedSender<ConsoleEvent>,
}

impl Console {
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<ConsoleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: ConsoleEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::trace!("Console closed, dropping event: {:?}", err.0);
        }
    }

    pub fn plain(&self, line: impl Into<String>) {
        self.send(ConsoleEvent::Plain(line.into()));
    }

    pub fn system(&self, tone: Tone, message: impl Into<String>) {
        self.send(ConsoleEvent::System {
            tone,
            message: message.into(),
        });
    }

    pub fn service(&self, service: &str, tone: Tone, message: impl Into<String>) {
        self.send(ConsoleEvent::Service {
            service: service.to_owned(),
            tone,
            message: message.into(),
        });
    }

    pub fn output(&self, service: &str, line: impl Into<String>) {
        self.send(ConsoleEvent::Output {
            service: service.to_owned(),
            line: line.into(),
        });
    }

    pub fn endpoints(&self, links: Vec<Link>) {
        self.send(ConsoleEvent::Endpoints(links));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_keep_send_order() {
        let (console, mut rx) = Console::channel();
        let other = console.clone();

        console.plain("banner");
        other.service("backend", Tone::Info, "Starting");
        console.output("backend", "listening");
        other.system(Tone::Failure, "boom");
        drop((console, other));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert_eq!(events[0], ConsoleEvent::Plain("banner".to_owned()));
        assert_eq!(events[1].tone(), Some(Tone::Info));
        assert_eq!(events[2].tone(), None);
        assert_eq!(events[3].tone(), Some(Tone::Failure));
    }

    #[test]
    fn test_closed_console_does_not_panic() {
        let (console, rx) = Console::channel();
        drop(rx);
        console.system(Tone::Info, "nobody listens");
    }
}
