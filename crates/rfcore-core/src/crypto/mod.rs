//! Crypto primitives: Crypto-1 (hand-written, see [`crypto1`]) plus thin
//! wrappers over the RustCrypto family for AES/DES/CMAC/SHA, grounded in
//! `spec.md` §4.8 — "AES, DES, CMAC (...), SHA-1, SHA-256 are standard" —
//! reached for rather than hand-rolled, since a maintained, audited crate
//! exists for each.

pub mod block;
pub mod cmac_util;
pub mod crypto1;
pub mod sha;

pub use crypto1::{
    feedback_parity_at, filter_bit_at, Crypto1State, FEEDBACK_TAPS, FILTER_TAPS,
};
