//! Hardnested Crypto-1 key recovery, `spec.md` §4.9.
//!
//! No upstream `hardnested_bf_core.c`/`hardnested_bruteforcer.c` (the
//! threading/dispatch layer) was available to port from, unlike
//! [`rfcore_staticnested`]'s `staticnested_0nt.c`. The core attack
//! mathematics, though, are in `cmdhfmfhard.c`: [`sumprop`]'s Sum(a8) prior
//! weights (`p_K[257]`) and [`partial`]'s per-half bucket formula
//! (`PartialSumProperty`) are both ported from it. Every module here
//! otherwise follows `spec.md` §4.9's phase-by-phase description; where that
//! leaves something underspecified and no corresponding source was found
//! (the worker-pool threading shape, the bitsliced engine's exact lane
//! width), the module documents its own choice rather than guessing at a
//! closed form. See `DESIGN.md` for the full accounting.
//!
//! Phases, each in its own module:
//! - (A) nonce acquisition and storage: [`nonces`]
//! - (B) bit-flip property filtering: [`flip`]
//! - (C) hypergeometric Sum(a8) confidence estimation: [`sumprop`]
//! - (D) partial state list generation: [`partial`]
//! - (E) candidate list generation: [`candidates`]
//! - (F) bitsliced brute force and the worker pool: [`bitslice`], [`pool`]

pub mod bitslice;
pub mod candidates;
pub mod flip;
pub mod nonces;
pub mod partial;
pub mod pool;
pub mod sumprop;

pub use nonces::{NonceFile, NoncePair};
pub use partial::{PartialState, PartialStateList};
pub use pool::{CandidateGroup, VerificationNonce, WorkerPool};

/// Minimum count of confident first-byte classes before phase (A) stops
/// acquiring nonces, per `spec.md` §4.9 phase (A).
pub const GOOD_BYTES_REQUIRED: usize = 13;

/// Minimum posterior confidence (phase C) for a first-byte class to count
/// as "good", per `spec.md` §4.9 phase (A).
pub const CONFIDENCE_THRESHOLD: f64 = 0.95;

/// Number of independent nonces checked per bitsliced group in phase (F).
pub const NONCE_TESTS: usize = 16;

/// Default hardnested worker count, matching the fixed-size pool `spec.md`
/// §5 describes for host-side cryptanalysis (mirrors
/// `rfcore_staticnested::DEFAULT_WORKERS`'s order of magnitude without
/// claiming the same literal constant, since hardnested's original source
/// — unlike static-nested's — was not retrieved).
pub const DEFAULT_WORKERS: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_spec_defaults() {
        assert_eq!(GOOD_BYTES_REQUIRED, 13);
        assert!((CONFIDENCE_THRESHOLD - 0.95).abs() < f64::EPSILON);
    }
}
