//! Contactless protocol framing, card emulation, secure-channel, CAD, and
//! crypto primitives for `rfcore`, per `spec.md` §§1-4.
//!
//! This crate holds the algorithms and state machines; `rfcore-membrane`
//! holds the arena, config, logging, and the `Runtime` context everything
//! here is threaded through explicitly instead of via process-wide globals
//! (`spec.md` §9).

pub mod cad;
pub mod crc;
pub mod crypto;
pub mod emulate;
pub mod error;
pub mod framing;
pub mod protocol;
pub mod secure;

pub use crc::{append_crc_a, crc_a};
pub use error::{Pm3Error, Pm3Result};
