//! Edit progress reporting for the CLI.
//!
//! `docedit edit` prints the same events the HTTP stream carries. On a
//! terminal they are narrated for humans (status on stderr, generated text
//! on stdout as it arrives); when piped, each event is one JSON object per
//! line on stdout so scripts can consume it.

use std::io::Write;

use docedit_core::models::StreamEvent;

/// Receives edit events as they are produced.
pub trait EventReporter: Send + Sync {
    fn report(&self, event: &StreamEvent);
}

/// Human-friendly narration.
pub struct HumanReporter;

impl EventReporter for HumanReporter {
    fn report(&self, event: &StreamEvent) {
        match event {
            StreamEvent::Thinking { content } => {
                let _ = writeln!(std::io::stderr().lock(), "… {}", content);
            }
            StreamEvent::Highlight { line } => {
                let _ = writeln!(std::io::stderr().lock(), "→ line {}", line);
            }
            StreamEvent::Token { content } => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(content.as_bytes());
                let _ = out.flush();
            }
            StreamEvent::Edit { operation } => {
                let _ = writeln!(std::io::stdout().lock());
                let _ = writeln!(
                    std::io::stderr().lock(),
                    "✎ {} lines {}-{}",
                    operation.operation,
                    operation.line_start,
                    operation.resolved_end()
                );
            }
            StreamEvent::Done { summary } => {
                let _ = writeln!(std::io::stderr().lock(), "✓ {}", summary);
            }
            StreamEvent::Error { message } => {
                let _ = writeln!(std::io::stderr().lock(), "✗ {}", message);
            }
        }
    }
}

/// Machine-readable output: one JSON event per line on stdout.
pub struct JsonReporter;

impl EventReporter for JsonReporter {
    fn report(&self, event: &StreamEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", line);
            let _ = out.flush();
        }
    }
}

/// Output mode for `docedit edit`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    /// Human output when stdout is a TTY, otherwise JSON lines.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stdout) {
            OutputMode::Human
        } else {
            OutputMode::Json
        }
    }

    pub fn reporter(&self) -> Box<dyn EventReporter> {
        match self {
            OutputMode::Human => Box::new(HumanReporter),
            OutputMode::Json => Box::new(JsonReporter),
        }
    }
}
