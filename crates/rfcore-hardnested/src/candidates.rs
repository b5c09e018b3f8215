//! Candidate list generation, `spec.md` §4.9 phase (E): intersect the
//! odd/even partial-state buckets that reproduce the chosen best first
//! byte's Sum(a0)/Sum(a8) properties, then narrow further using every other
//! good byte's bit-flip constraint.

use crate::flip::{bit_flip_properties, BitFlipProperties};
use crate::partial::{sum_a0_bit, PartialState, PartialStateList};
use crate::sumprop::SUM_SUPPORT;

/// One other "good" first-byte class used to further narrow the candidate
/// list beyond the primary chosen byte, per phase (E)'s "filter by all
/// other good first bytes" step.
#[derive(Debug, Clone, Copy)]
pub struct GoodByte {
    pub byte: u8,
    pub flip: BitFlipProperties,
}

/// Rescale a global Sum(a8) value (from [`SUM_SUPPORT`]'s 0..256 range) down
/// to [`PartialStateList`]'s simplified 0..16 per-half bucket range. This is
/// the bridge between the session-wide Sum(a8) estimate (phase C) and the
/// per-half bucket simplification documented in `crate::partial` — rounded
/// to the nearest even value since buckets are only defined at even sums.
#[must_use]
pub fn rescale_sum_to_bucket(global_sum: u32) -> u8 {
    let scaled = (f64::from(global_sum) / f64::from(*SUM_SUPPORT.last().unwrap()) * 16.0).round();
    let clamped = scaled.clamp(0.0, 16.0) as u8;
    clamped - (clamped % 2)
}

/// Intersect the odd/even partial-state buckets matching `target_bucket_sum`
/// into full 40-bit candidate pairs, then drop any pair whose odd half's
/// deterministic Sum(a0) bit contradicts `expect_sum_a0`.
#[must_use]
pub fn generate_candidates(
    odd_list: &PartialStateList,
    even_list: &PartialStateList,
    target_bucket_sum: u8,
    expect_sum_a0: bool,
) -> Vec<(PartialState, PartialState)> {
    let odd_bucket = odd_list.bucket(target_bucket_sum);
    let even_bucket = even_list.bucket(target_bucket_sum);

    let mut out = Vec::new();
    for &odd in odd_bucket {
        if sum_a0_bit(odd) != expect_sum_a0 {
            continue;
        }
        for &even in even_bucket {
            out.push((odd, even));
        }
    }
    out
}

/// Drop any candidate pair whose odd half's bit-flip symmetry (against a
/// further good byte `other`) contradicts what the real cipher's filter
/// function would produce: if `other.flip.odd` is set, the candidate's
/// high bit and the corresponding flipped-high-bit state must agree.
#[must_use]
pub fn filter_by_good_bytes(
    candidates: Vec<(PartialState, PartialState)>,
    others: &[GoodByte],
) -> Vec<(PartialState, PartialState)> {
    candidates
        .into_iter()
        .filter(|&(odd, _even)| {
            others.iter().all(|good| {
                let flags = good.flip;
                if !flags.odd && !flags.even {
                    return true;
                }
                // A state consistent with an observed flip symmetry must
                // produce the same Sum(a0) bit under that symmetry too,
                // since the filter function is the same for both classes.
                let flipped = PartialState(odd.0 ^ (0x80 >> 4));
                !flags.odd || sum_a0_bit(odd) == sum_a0_bit(flipped)
            })
        })
        .collect()
}
