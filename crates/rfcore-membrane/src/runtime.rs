//! The session-wide context threaded explicitly through `rfcore-core`'s
//! state machines, in place of the firmware's file-scope globals (`BigBuf`,
//! `tracing`, the various `static` session flags in `appmain.c`).
//!
//! Per `spec.md`'s design notes (§9): "Global mutable state... reifies as a
//! single `Runtime` context passed explicitly through the core API." A
//! single context struct (rather than `lazy_static`/global `Mutex`s
//! scattered per module) owns the arena and cross-cutting services.

use std::io;

use crate::bigbuf::BigBuf;
use crate::config::RuntimeConfig;
use crate::log::{LogEmitter, LogEntry};
use crate::trace::TraceLog;

/// Bundles the arena, its derived trace view, the active configuration, and
/// the structured log sink that every reader/tag state machine writes
/// through.
pub struct Runtime {
    bigbuf: BigBuf,
    config: RuntimeConfig,
    log: LogEmitter<Box<dyn io::Write + Send>>,
}

impl Runtime {
    /// Build a runtime from an explicit configuration and log sink. Prefer
    /// this in tests and in `rfcore-cli`, which owns where logs go.
    #[must_use]
    pub fn new(config: RuntimeConfig, log_sink: Box<dyn io::Write + Send>) -> Self {
        Self {
            bigbuf: BigBuf::new(config.bigbuf_size),
            log: LogEmitter::new(log_sink, config.log_level),
            config,
        }
    }

    /// Build a runtime from process-wide config (`RFCORE_*` env vars) writing
    /// structured logs to stderr, the way the CLI binary does by default.
    #[must_use]
    pub fn from_env() -> Self {
        let config = crate::config::runtime_config();
        Self::new(config, Box::new(io::stderr()))
    }

    #[must_use]
    pub fn bigbuf(&self) -> &BigBuf {
        &self.bigbuf
    }

    #[must_use]
    pub fn trace(&self) -> TraceLog<'_> {
        TraceLog::new(&self.bigbuf)
    }

    #[must_use]
    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    /// Emit a structured log entry through this runtime's sink. I/O failures
    /// are swallowed: a blocked or closed log stream must never abort a card
    /// exchange in progress.
    pub fn log(&mut self, entry: LogEntry) {
        let _ = self.log.emit(&entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogLevel;

    #[test]
    fn log_writes_go_through_configured_sink() {
        let config = RuntimeConfig {
            bigbuf_size: 256,
            worker_threads: 1,
            log_level: LogLevel::Trace,
        };
        let mut rt = Runtime::new(config, Box::new(Vec::<u8>::new()));
        rt.log(LogEntry::new(LogLevel::Info, "runtime.init"));
    }
}
