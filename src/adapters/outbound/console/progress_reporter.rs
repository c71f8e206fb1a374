use crate::ports::outbound::ProgressReporter;
use owo_colors::{OwoColorize, Stream};

/// StderrProgressReporter adapter for reporting harness progress to stderr
///
/// Server and test-runner output is interleaved on the same terminal, so
/// every message is a single prefixed line rather than a redrawn progress
/// bar. Colors are only emitted when stderr is a terminal.
pub struct StderrProgressReporter {
    prefix: &'static str,
}

impl StderrProgressReporter {
    pub fn new() -> Self {
        Self { prefix: "[harness]" }
    }

    fn prefix(&self) -> String {
        self.prefix
            .if_supports_color(Stream::Stderr, |text| text.cyan())
            .to_string()
    }
}

impl Default for StderrProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a bounded step like `(3/25)`; the message is optional
pub fn format_progress(current: usize, total: usize, message: Option<&str>) -> String {
    match message {
        Some(msg) => format!("({}/{}) {}", current, total, msg),
        None => format!("({}/{})", current, total),
    }
}

impl ProgressReporter for StderrProgressReporter {
    fn report(&self, message: &str) {
        eprintln!("{} {}", self.prefix(), message);
    }

    fn report_progress(&self, current: usize, total: usize, message: Option<&str>) {
        eprintln!(
            "{} {}",
            self.prefix(),
            format_progress(current, total, message)
        );
    }

    fn report_error(&self, message: &str) {
        eprintln!(
            "{} {}",
            self.prefix(),
            message.if_supports_color(Stream::Stderr, |text| text.yellow())
        );
    }

    fn report_completion(&self, message: &str) {
        eprintln!(
            "{} {}",
            self.prefix(),
            message.if_supports_color(Stream::Stderr, |text| text.green())
        );
    }
}
