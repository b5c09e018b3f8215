//! Static-nested (reused-key) Crypto-1 key recovery, `spec.md` §4.10.
//!
//! Layered the way `rfcore-hardnested` sits beside it: both are offline
//! cryptanalysis engines built on top of `rfcore-core`'s `Crypto1State`, and
//! both report progress through `rfcore-membrane`'s `CrackMetrics` rather
//! than printing directly, so a CLI or a test harness can observe progress
//! either way.
//!
//! Grounded throughout in
//! `tools/mfc/card_only/staticnested_0nt.c`: the
//! attack recovers a MIFARE Classic key shared across several authentications
//! to the same sector from nothing but the captured `{uid, nt_enc,
//! nt_par_enc}` triples, by enumerating every plaintext nonce the tag's PRNG
//! could have produced after each `nt_enc`, narrowing with a 3-bit parity
//! check ([`recovery::valid_nonce`]), recovering full Crypto-1 states
//! consistent with each surviving candidate ([`recovery::recover_states`]),
//! and keeping only the states that also explain every other captured nonce
//! ([`pool::intersect_candidates`]).

pub mod dict;
pub mod pool;
pub mod prng;
pub mod recovery;

pub use dict::{format_dic, write_dic};
pub use pool::{intersect_candidates, DEFAULT_CHUNK_DIVISOR, DEFAULT_WORKERS};
pub use prng::{prng_successor, validate_prng_nonce};
pub use recovery::{build_nt_data, recover_states, search_match, valid_nonce, NtData, NtpKs1};

use rfcore_membrane::metrics::CrackMetrics;

/// Run the full static-nested attack over a set of captured nested-auth
/// nonces: build each nonce's candidate list (`spec.md` §4.10 step 1), then
/// intersect the first against the rest (steps 2-4), reporting candidate
/// counts through `metrics` as each nonce's candidate list completes.
///
/// `captures` is `(authuid, nt_enc, nt_par_enc)` per captured authentication;
/// the original requires at least two. Returns every 48-bit key consistent
/// with all of them.
#[must_use]
pub fn recover_keys(
    captures: &[(u32, u32, u8)],
    metrics: &CrackMetrics,
    workers: usize,
    chunk_divisor: usize,
) -> Vec<u64> {
    if captures.len() < 2 {
        return Vec::new();
    }
    let nonces: Vec<NtData> = captures
        .iter()
        .map(|&(authuid, nt_enc, nt_par_enc)| {
            let data = build_nt_data(authuid, nt_enc, nt_par_enc);
            metrics.add_candidates_generated(data.candidates.len() as u64);
            metrics.record_nonce();
            data
        })
        .collect();

    let (primary, others) = nonces.split_first().expect("checked len >= 2 above");
    let keys = intersect_candidates(primary, others, workers, chunk_divisor);
    metrics.add_candidates_tested(primary.candidates.len() as u64);
    if !keys.is_empty() {
        metrics.record_key_found();
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recover_keys_returns_empty_for_fewer_than_two_captures() {
        let metrics = CrackMetrics::default();
        assert!(recover_keys(&[(0, 0, 0)], &metrics, 4, 2).is_empty());
        assert!(recover_keys(&[], &metrics, 4, 2).is_empty());
    }
}
