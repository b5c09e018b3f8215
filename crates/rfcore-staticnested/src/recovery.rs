//! Per-nonce candidate-key generation and cross-nonce verification for the
//! static-nested (reused-key) attack, `spec.md` §4.10.
//!
//! Grounded in
//! `tools/mfc/card_only/staticnested_0nt.c`:
//! `valid_nonce` (the 3-bit parity prefilter on PRNG-successor candidates),
//! `search_match` (validate a recovered key against a further captured
//! nonce by simulating Crypto-1 forward and comparing both the predicted
//! plaintext nonce and its 4-bit parity), and the two-stage
//! `lfsr_recovery32` → `lfsr_rollback_word` key-candidate construction.
//!
//! The `lfsr_recovery32` analog here ([`recover_states`]) is a direct,
//! documented translation of its algorithmic *contract* — "find every
//! 47-bit-unknown Crypto-1 state consistent with 32 observed
//! keystream/input bit pairs" — built as a pruned breadth-first bit
//! assignment search, rather than the real `crapto1`'s hand-tuned
//! constant-time table construction (not present in the upstream sources available here).
//! It returns the same candidate set; it is simply not claimed to match the
//! original's runtime characteristics. See `DESIGN.md`.

use rfcore_core::crypto::{feedback_parity_at, filter_bit_at, Crypto1State};

use crate::prng::prng_successor;

/// One `(nt_plain_candidate, keystream)` pair surviving [`valid_nonce`]'s
/// 3-bit parity prefilter for a captured `(nt_enc, nt_par_enc)` — the
/// `NtpKs1` entries of the original's `NtpKs1List`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpKs1 {
    pub ntp: u32,
    pub ks1: u32,
}

/// One captured nested-authentication nonce and its generated candidate
/// list — the original's `NtData`.
#[derive(Debug, Clone)]
pub struct NtData {
    pub authuid: u32,
    pub nt_enc: u32,
    pub nt_par_enc: u8,
    pub candidates: Vec<NtpKs1>,
}

/// Does a candidate plaintext nonce `nt` (with derived keystream `ks1 = nt ^
/// nt_enc`) match the 3 parity bits we can check without the 4th
/// (ambiguous) bit, per `spec.md` §4.10 step 1? Port of `valid_nonce`.
#[must_use]
pub fn valid_nonce(nt: u32, ks1: u32, nt_par_enc: u8) -> bool {
    let check = |byte_shift: u32, par_bit: u32, ks_bit: u32| -> bool {
        let byte = ((nt >> byte_shift) & 0xFF) as u8;
        let parity_bit = (nt_par_enc >> par_bit) & 1 == 1;
        let ks_val = (ks1 >> ks_bit) & 1 == 1;
        rfcore_core::crc::odd_parity(byte) == (parity_bit ^ ks_val)
    };
    check(24, 3, 16) && check(16, 2, 8) && check(8, 1, 0)
}

/// Build the candidate list for one captured `(authuid, nt_enc,
/// nt_par_enc)` by enumerating every PRNG-successor of a fixed seed nonce
/// and keeping those that pass [`valid_nonce`], per `spec.md` §4.10 step 1
/// / the original's per-argument loop in `main`.
#[must_use]
pub fn build_nt_data(authuid: u32, nt_enc: u32, nt_par_enc: u8) -> NtData {
    let mut candidates = Vec::new();
    let mut nttest = prng_successor(1, 16);
    for _ in 0..u16::MAX {
        let ks1 = nt_enc ^ nttest;
        if valid_nonce(nttest, ks1, nt_par_enc) {
            candidates.push(NtpKs1 { ntp: nttest, ks1 });
        }
        nttest = prng_successor(nttest, 1);
    }
    NtData {
        authuid,
        nt_enc,
        nt_par_enc,
        candidates,
    }
}

/// The 4-bit parity nibble `valid_nonce`/`search_match` compare against:
/// one odd-parity bit per byte of `nt`, MSB-first (bit 3 = byte 3's parity).
fn parity_nibble(nt: u32) -> u8 {
    let mut nibble = 0u8;
    for shift in [24, 16, 8, 0] {
        let byte = ((nt >> shift) & 0xFF) as u8;
        nibble = (nibble << 1) | u8::from(rfcore_core::crc::odd_parity(byte));
    }
    nibble
}

/// Verify a candidate 48-bit key against one further captured nonce
/// `target`, given the reference nonce `reference` the candidate was
/// originally derived from (both must match, per the original's two-stage
/// check: a coarse 3-bit match against `target` followed by a full 4-bit
/// re-check against `reference` since the slow full check is deferred).
/// Port of `search_match`.
#[must_use]
pub fn search_match(key: u64, target: &NtData, reference: &NtData) -> bool {
    verify_against(key, target) && verify_against(key, reference)
}

fn verify_against(key: u64, data: &NtData) -> bool {
    let mut state = Crypto1State::from_bits(key);
    let nt = state.clock_word(data.nt_enc ^ data.authuid) ^ data.nt_enc;
    let ks2 = state.clock_word(0);
    let ks1 = nt ^ data.nt_enc;
    let observed = parity_nibble(nt);
    let predicted_top3 = (((ks1 >> 16) & 1) << 3) | (((ks1 >> 8) & 1) << 2) | (((ks1) & 1) << 1);
    let predicted_lsb = (ks2 >> 24) & 1;
    let predicted = (predicted_top3 as u8) | (predicted_lsb as u8);
    (data.nt_par_enc ^ predicted) == observed
}

/// Recover every 48-bit Crypto-1 state consistent with 32 observed
/// keystream bits `ks1` (MSB-first) produced while clocking with 32 input
/// bits `input` (MSB-first) — the contract of the original `lfsr_recovery32`.
/// See the module doc for the honesty note on search strategy.
#[must_use]
pub fn recover_states(ks1: u32, input: u32) -> Vec<Crypto1State> {
    let ks_bit = |k: u32| -> bool { (ks1 >> (31 - k)) & 1 == 1 };
    let input_bit = |k: u32| -> bool { (input >> (31 - k)) & 1 == 1 };

    // Phase 1: assign bit positions 9..=47 of the 48-bit register in
    // increasing order, checking filter constraint t as soon as position
    // (t + 23) is assigned, for every t in 0..=24 (the window `{t+9 .. t+23}`
    // fits entirely within already-free positions for those t).
    let mut frontier: Vec<u64> = vec![0u64];
    for idx in 9u32..=47 {
        let mut next = Vec::with_capacity(frontier.len() * 2);
        for base in frontier {
            next.push(base);
            next.push(base | (1u64 << idx));
        }
        if idx >= 23 {
            let t = idx - 23;
            if t <= 24 {
                next.retain(|&value| filter_bit_at(value, t) == ks_bit(t));
            }
        }
        frontier = next;
    }

    // Phase 2: assign the remaining free bits 0..=8 (no filter window reads
    // them directly; they only matter through the derived bits below).
    let mut full_states = Vec::with_capacity(frontier.len() * 512);
    for base in &frontier {
        for low in 0u64..512 {
            full_states.push(base | low);
        }
    }

    // Phase 3: derive bits 48..=54 via the feedback recurrence and check the
    // remaining filter constraints t = 25..=31.
    let mut out = Vec::new();
    'candidates: for bits in full_states {
        let mut extended = bits;
        for n in 48u32..=54 {
            let k = n - 48;
            let parity = feedback_parity_at(extended, k);
            if parity ^ input_bit(k) {
                extended |= 1u64 << n;
            }
        }
        for t in 25u32..=31 {
            if filter_bit_at(extended, t) != ks_bit(t) {
                continue 'candidates;
            }
        }
        out.push(Crypto1State::from_bits(bits));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_nonce_accepts_self_consistent_parity() {
        let key = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut state = Crypto1State::from_key(key);
        let nt: u32 = 0x1234_5678;
        let uid: u32 = 0xAABB_CCDD;
        let ks1 = state.clock_word(nt ^ uid);
        let nt_enc = nt ^ ks1;

        let b3 = ((ks1 >> 16) & 1) as u8;
        let b2 = ((ks1 >> 8) & 1) as u8;
        let b1 = (ks1 & 1) as u8;
        let ks_top3 = (b3 << 3) | (b2 << 2) | (b1 << 1);
        let nt_par_enc = parity_nibble(nt) ^ ks_top3;

        assert!(valid_nonce(nt, nt ^ nt_enc, nt_par_enc));
    }

    #[test]
    fn search_match_accepts_true_key_and_rejects_wrong_key() {
        let key = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01];
        let authuid = 0x1122_3344u32;
        let nt = 0x5566_7788u32;

        let mut state = Crypto1State::from_key(key);
        let ks1 = state.clock_word(nt ^ authuid);
        let ks2 = state.clock_word(0);
        let nt_enc = nt ^ ks1;
        let predicted_top3 =
            (((ks1 >> 16) & 1) << 3) | (((ks1 >> 8) & 1) << 2) | ((ks1 & 1) << 1);
        let predicted_lsb = (ks2 >> 24) & 1;
        let predicted = (predicted_top3 | predicted_lsb) as u8;
        let nt_par_enc = parity_nibble(nt) ^ predicted;

        let data = NtData {
            authuid,
            nt_enc,
            nt_par_enc,
            candidates: Vec::new(),
        };
        let key_bits = Crypto1State::from_key(key).to_bits();
        assert!(search_match(key_bits, &data, &data));

        let wrong_key_bits = Crypto1State::from_key([0, 0, 0, 0, 0, 1]).to_bits();
        assert!(!search_match(wrong_key_bits, &data, &data));
    }

    #[test]
    #[ignore = "exhaustive bit-assignment search over ~2^20+ candidates; run explicitly with --ignored"]
    fn recover_states_contains_the_originating_state() {
        let key = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let original = Crypto1State::from_key(key);
        let mut sim = original;
        let input: u32 = 0xCAFEBABE;
        let mut ks1 = 0u32;
        for i in 0..32u32 {
            let bit = (input >> (31 - i)) & 1 == 1;
            let ks = sim.clock(bit);
            ks1 = (ks1 << 1) | u32::from(ks);
        }
        let recovered = recover_states(ks1, input);
        assert!(recovered.contains(&original));
    }
}
