//! Structured logger rendering `gmr1_core::logging::LogEntry` records as
//! pretty/json/logfmt text on stderr, selected by `--log-format`.

use chrono::Utc;
use serde::Serialize;

use gmr1_core::logging::{LogEntry, LogLevel};

use crate::config::LogFormat;

#[derive(Serialize)]
struct JsonEntry<'a> {
    ts: String,
    level: &'static str,
    subsystem: &'a str,
    message: &'a str,
}

fn level_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

/// Renders log entries to stderr in the configured format. Stateless aside
/// from the format selection; entries are read from a `SignalLogger`
/// snapshot after each run (or after a channel terminates), matching the
/// original's end-of-run diagnostic dump rather than a live stream.
pub struct StructuredLogger {
    format: LogFormat,
}

impl StructuredLogger {
    pub fn new(format: LogFormat) -> Self {
        Self { format }
    }

    pub fn emit(&self, entry: &LogEntry) {
        let line = match self.format {
            LogFormat::Json => self.format_json(entry),
            LogFormat::Logfmt => self.format_logfmt(entry),
            LogFormat::Pretty => self.format_pretty(entry),
        };
        eprintln!("{}", line);
    }

    pub fn emit_all(&self, entries: &[LogEntry]) {
        for entry in entries {
            self.emit(entry);
        }
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        let record = JsonEntry {
            ts: Utc::now().to_rfc3339(),
            level: level_str(entry.level),
            subsystem: entry.subsystem,
            message: &entry.message,
        };
        serde_json::to_string(&record).unwrap_or_else(|_| entry.message.clone())
    }

    fn format_logfmt(&self, entry: &LogEntry) -> String {
        format!(
            "ts=\"{}\" level={} subsystem={} msg=\"{}\"",
            Utc::now().to_rfc3339(),
            level_str(entry.level),
            entry.subsystem,
            entry.message
        )
    }

    fn format_pretty(&self, entry: &LogEntry) -> String {
        format!(
            "[{}] {}: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.subsystem,
            entry.message
        )
    }
}
