use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{self, Stdout, Write};

use colored::{Color, ColoredString, Colorize};
use tandem_core::{ConsoleEvent, Link, Tone};

pub struct Logger<W: Write = Stdout> {
    output: W,
}

impl<W: Write> Logger<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    fn string_to_color(s: &str) -> Color {
        let colors = [
            Color::Green,
            Color::Blue,
            Color::Magenta,
            Color::Cyan,
            Color::BrightGreen,
            Color::BrightBlue,
            Color::BrightMagenta,
            Color::BrightCyan,
        ];

        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        let hash = hasher.finish();

        let idx = usize::try_from(hash).unwrap_or_default() % colors.len();
        colors[idx]
    }

    fn paint(tone: Tone, message: &str) -> ColoredString {
        match tone {
            Tone::Info => message.normal(),
            Tone::Success => message.green(),
            Tone::Warning => message.yellow(),
            Tone::Failure => message.red().bold(),
            Tone::Interrupted => message.bright_yellow(),
        }
    }

    pub fn render(&mut self, event: &ConsoleEvent) {
        match event {
            ConsoleEvent::Plain(line) => self.plain(line),
            ConsoleEvent::System { tone, message } => self.system(*tone, message),
            ConsoleEvent::Service {
                service,
                tone,
                message,
            } => self.status(service, *tone, message),
            ConsoleEvent::Output { service, line } => self.log(service, line),
            ConsoleEvent::Endpoints(links) => self.endpoints(links),
        }
    }

    pub fn plain(&mut self, line: &str) {
        let _ = writeln!(self.output, "{line}");
    }

    /// Output of a service, one prefixed line per input line.
    pub fn log(&mut self, service_name: &str, message: &str) {
        let prefix = format!("[{service_name}]").color(Self::string_to_color(service_name));
        if message.is_empty() {
            let _ = writeln!(self.output, "{prefix}");
            return;
        }
        for line in message.lines() {
            let _ = writeln!(self.output, "{prefix} {line}");
        }
    }

    pub fn status(&mut self, service_name: &str, tone: Tone, message: &str) {
        let prefix = format!("[{service_name}]").color(Self::string_to_color(service_name));
        let _ = writeln!(self.output, "{prefix} {}", Self::paint(tone, message));
    }

    pub fn system(&mut self, tone: Tone, message: &str) {
        let prefix = "[tandem]".bold();
        for line in message.lines() {
            let _ = writeln!(self.output, "{prefix} {}", Self::paint(tone, line));
        }
    }

    pub fn endpoints(&mut self, links: &[Link]) {
        let width = links.iter().map(|link| link.label.len()).max().unwrap_or(0) + 1;
        for link in links {
            let label = format!("{}:", link.label);
            let _ = writeln!(self.output, "  {label:<width$} {}", link.url.underline());
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}
