//! Hardnested worker pool, `spec.md` §4.9 phase (F) / §5's thread model:
//! "workers pull buckets from a shared queue; first successful key
//! atomically stores into a shared slot and signals all others to exit.
//! Termination when queue empty or key found."
//!
//! Each group's remaining 256 candidates (the 8 still-unknown low bits, 4
//! per half) are tested through the lane-width-generic bitsliced engine in
//! [`crate::bitslice`] rather than one `Crypto1State` at a time: all 256
//! completions are packed into a single 256-wide [`BitSlicedState`], then
//! every verification nonce is clocked through all lanes at once, narrowing
//! a `survivors` bitmask instead of branching per candidate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::bitslice::{
    all_ones_plane, any_survivor, broadcast_plane, plane_not, plane_xor, surviving_lanes,
    update_survivors, zero_plane, BitSlicedState,
};
use crate::partial::PartialState;
use rfcore_core::crypto::Crypto1State;

/// Lanes bitsliced per candidate group: every completion of the 8 unknown
/// low bits (4 per half), `spec.md` phase (F)'s "partition candidate state
/// pairs into `MAX_BITSLICES`-wide groups" collapsed to this group's own
/// full 256-candidate space in one bitsliced pass.
const GROUP_LANES: usize = 256;

/// One candidate group handed to a worker: an odd/even partial-state pair
/// plus the 8 unknown low bits to complete, per `spec.md` phase (F)'s
/// "partition candidate state pairs into `MAX_BITSLICES`-wide groups".
#[derive(Debug, Clone, Copy)]
pub struct CandidateGroup {
    pub odd_partial: PartialState,
    pub even_partial: PartialState,
}

/// One captured nonce/parity observation used to verify candidates during
/// phase (F) step 2 ("advance the bitsliced state... comparing computed
/// parity bits to observed parity bits").
#[derive(Debug, Clone, Copy)]
pub struct VerificationNonce {
    pub nt_enc: u32,
    pub observed_parity: u8,
}

/// Test every low-8-bit completion of one candidate group against every
/// verification nonce, returning the full 48-bit keys (well, states — the
/// caller rolls back to the key separately) that survive all of them.
///
/// All 256 completions are bitsliced into one [`BitSlicedState`]; each
/// nonce's 32-bit keystream word (`clock_word(0)`'s bitsliced equivalent:
/// 32 zero-input clocks) is computed for every lane at once, then the
/// resulting nonce-parity nibble is compared against the observed parity to
/// narrow a `survivors` mask — the same per-nonce match definition the
/// scalar brute force used (nonce's encrypted value XORed with the
/// candidate's keystream word, then the odd-parity of each of its four
/// bytes compared against the observed parity nibble).
#[must_use]
pub fn brute_force_group(
    group: CandidateGroup,
    nonces: &[VerificationNonce],
) -> Vec<Crypto1State> {
    let mut odd_lanes = Vec::with_capacity(GROUP_LANES);
    let mut even_lanes = Vec::with_capacity(GROUP_LANES);
    for low in 0u32..GROUP_LANES as u32 {
        let low_odd = low & 0x0F;
        let low_even = (low >> 4) & 0x0F;
        odd_lanes.push((group.odd_partial.0 << 4) | low_odd);
        even_lanes.push((group.even_partial.0 << 4) | low_even);
    }
    let base = BitSlicedState::pack(GROUP_LANES, &odd_lanes, &even_lanes);

    let mut survivors = all_ones_plane(GROUP_LANES);
    for n in nonces {
        let mut sim = base.clone();
        let zero_input = zero_plane(GROUP_LANES);

        // clock_word(0): 32 zero-input clocks, MSB-first keystream bit order.
        let ks_planes: Vec<Vec<u64>> = (0..32).map(|_| sim.clock(&zero_input)).collect();

        // nt = ks_word ^ nt_enc, per lane: XOR each keystream bit-plane with
        // the corresponding constant bit of this nonce's `nt_enc`.
        let nt_planes: Vec<Vec<u64>> = ks_planes
            .iter()
            .enumerate()
            .map(|(i, plane)| {
                let bit_pos = 31 - i;
                if (n.nt_enc >> bit_pos) & 1 == 1 {
                    plane_not(plane)
                } else {
                    plane.clone()
                }
            })
            .collect();

        // One odd_parity bit per nt byte, matching `shift in [24, 16, 8, 0]`.
        for (bit_idx, shift) in [24usize, 16, 8, 0].into_iter().enumerate() {
            let start = 24 - shift; // first ks_planes index (MSB-first) of this byte
            let mut xor_acc = zero_plane(GROUP_LANES);
            for plane in &nt_planes[start..start + 8] {
                xor_acc = plane_xor(&xor_acc, plane);
            }
            let parity_plane = plane_not(&xor_acc); // odd_parity: true iff an even bit count
            let observed_bit = (n.observed_parity >> (3 - bit_idx)) & 1 == 1;
            let observed_plane = broadcast_plane(GROUP_LANES, observed_bit);
            survivors = update_survivors(&survivors, &parity_plane, &observed_plane);
        }

        if !any_survivor(&survivors) {
            return Vec::new();
        }
    }

    surviving_lanes(&survivors)
        .into_iter()
        .map(|lane| Crypto1State {
            odd: base.odd.lane(lane),
            even: base.even.lane(lane),
        })
        .collect()
}

/// Shared state for a hardnested worker pool: a queue of candidate groups,
/// a `found` flag workers poll between groups, and the first surviving key.
pub struct WorkerPool {
    queue: Mutex<Vec<CandidateGroup>>,
    next: AtomicUsize,
    found: AtomicBool,
    result: Mutex<Option<Crypto1State>>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(groups: Vec<CandidateGroup>) -> Self {
        Self {
            queue: Mutex::new(groups),
            next: AtomicUsize::new(0),
            found: AtomicBool::new(false),
            result: Mutex::new(None),
        }
    }

    /// Run `worker_count` threads pulling groups from the shared queue until
    /// it is empty or a key is found (checked between groups), per `spec.md`
    /// §5's thread model.
    #[must_use]
    pub fn run(&self, worker_count: usize, nonces: &[VerificationNonce]) -> Option<Crypto1State> {
        let total = self.queue.lock().len();
        std::thread::scope(|scope| {
            for _ in 0..worker_count.max(1) {
                scope.spawn(|| loop {
                    if self.found.load(Ordering::Relaxed) {
                        return;
                    }
                    let idx = self.next.fetch_add(1, Ordering::Relaxed);
                    if idx >= total {
                        return;
                    }
                    let group = self.queue.lock()[idx];
                    let survivors = brute_force_group(group, nonces);
                    if let Some(&key) = survivors.first() {
                        *self.result.lock() = Some(key);
                        self.found.store(true, Ordering::Relaxed);
                        return;
                    }
                });
            }
        });
        *self.result.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brute_force_group_recovers_the_originating_state() {
        let key = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let original = Crypto1State::from_key(key);

        let group = CandidateGroup {
            odd_partial: PartialState(original.odd >> 4),
            even_partial: PartialState(original.even >> 4),
        };

        let mut sim = original;
        let ks1 = sim.clock_word(0);
        let nt = 0x1234_5678u32;
        let nt_enc = nt ^ ks1;
        let mut nibble = 0u8;
        for shift in [24, 16, 8, 0] {
            let byte = ((nt >> shift) & 0xFF) as u8;
            nibble = (nibble << 1) | u8::from(rfcore_core::crc::odd_parity(byte));
        }

        let nonces = vec![VerificationNonce {
            nt_enc,
            observed_parity: nibble,
        }];
        let survivors = brute_force_group(group, &nonces);
        assert!(survivors.contains(&original));
    }

    #[test]
    fn worker_pool_returns_none_for_empty_queue() {
        let pool = WorkerPool::new(Vec::new());
        assert!(pool.run(4, &[]).is_none());
    }
}
