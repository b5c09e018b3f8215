//! Structured logging: a small `serde`/`serde_json`-backed JSONL record,
//! not a `log`/`tracing` facade. Protocol and secure-channel
//! code emits one `LogEntry` per state transition or decode failure; the CLI
//! (`rfcore-cli`) owns where the stream is written (stdout, a file, or
//! nowhere at all below the configured `LogLevel`).

use serde::{Deserialize, Serialize};
use std::io::Write;

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" | "err" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// One structured log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Short machine-readable event name, e.g. `"iso14443a.state_transition"`.
    pub event: String,
    /// Free-form context (protocol name, state, error detail, ...).
    #[serde(skip_serializing_if = "serde_json::Map::is_empty", default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            level,
            event: event.into(),
            fields: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// Writes `LogEntry` records as JSONL to any `Write` sink, filtering by a
/// minimum level.
pub struct LogEmitter<W: Write> {
    sink: W,
    min_level: LogLevel,
}

impl<W: Write> LogEmitter<W> {
    #[must_use]
    pub fn new(sink: W, min_level: LogLevel) -> Self {
        Self { sink, min_level }
    }

    pub fn emit(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }
        let line = serde_json::to_string(entry)?;
        writeln!(self.sink, "{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_below_min_level() {
        let mut buf = Vec::new();
        {
            let mut emitter = LogEmitter::new(&mut buf, LogLevel::Warn);
            emitter
                .emit(&LogEntry::new(LogLevel::Debug, "should.be.filtered"))
                .unwrap();
            emitter
                .emit(&LogEntry::new(LogLevel::Error, "should.pass"))
                .unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("should.be.filtered"));
        assert!(text.contains("should.pass"));
    }

    #[test]
    fn roundtrips_through_json() {
        let entry = LogEntry::new(LogLevel::Info, "desfire.auth")
            .with_field("aid", "2F81F4")
            .with_field("algo", "aes");
        let json = serde_json::to_string(&entry).unwrap();
        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, "desfire.auth");
        assert_eq!(back.fields.get("aid").unwrap(), "2F81F4");
    }
}
