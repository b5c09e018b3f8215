//! Runtime configuration.
//!
//! A small set of env-var-driven knobs, read once and cached in a
//! `OnceLock`, rather than a
//! config-file loader (out of scope per `spec.md` §1 — config loaders are
//! named as excluded CLI plumbing, but the ambient knobs the core itself
//! needs are not).

use std::sync::OnceLock;

use crate::bigbuf::BIGBUF_SIZE;

/// Runtime knobs for the protocol/emulation core and the offline crackers.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Arena size in bytes. Overridable via `RFCORE_BIGBUF_SIZE` for hosts
    /// that want more trace headroom than the firmware's 40000-byte default.
    pub bigbuf_size: usize,
    /// Worker count for hardnested/static-nested thread pools. Overridable
    /// via `RFCORE_WORKER_THREADS`; defaults to the available parallelism.
    pub worker_threads: usize,
    pub log_level: crate::log::LogLevel,
}

impl RuntimeConfig {
    fn from_env() -> Self {
        let bigbuf_size = std::env::var("RFCORE_BIGBUF_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(BIGBUF_SIZE);
        let worker_threads = std::env::var("RFCORE_WORKER_THREADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            });
        let log_level = std::env::var("RFCORE_LOG_LEVEL")
            .ok()
            .map(|v| crate::log::LogLevel::from_str_loose(&v))
            .unwrap_or(crate::log::LogLevel::Info);
        Self {
            bigbuf_size,
            worker_threads,
            log_level,
        }
    }
}

static GLOBAL_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Get the process-wide runtime configuration (reads env vars on first call,
/// caches thereafter).
#[must_use]
pub fn runtime_config() -> RuntimeConfig {
    *GLOBAL_CONFIG.get_or_init(RuntimeConfig::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bigbuf_size_matches_firmware_constant() {
        // Constructed directly (not via the cached global) so the test is
        // independent of environment and call order.
        let cfg = RuntimeConfig::from_env();
        if std::env::var("RFCORE_BIGBUF_SIZE").is_err() {
            assert_eq!(cfg.bigbuf_size, BIGBUF_SIZE);
        }
    }
}
