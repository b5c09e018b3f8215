//! BigBuf arena, append-only trace log, runtime configuration, and structured
//! logging shared by every protocol and emulation state machine in `rfcore-core`.
//!
//! This crate is the stateful substrate the rest of the workspace builds on:
//! a single place that owns the arena and the session's mutable state so the
//! algorithmic crates above it stay free of global statics.

#![deny(unsafe_code)]

pub mod bigbuf;
pub mod config;
pub mod log;
pub mod metrics;
pub mod runtime;
pub mod trace;

pub use bigbuf::{BigBuf, BIGBUF_SIZE, CARD_MEMORY_SIZE};
pub use config::RuntimeConfig;
pub use runtime::Runtime;
pub use trace::{TraceEntry, TraceLog};
