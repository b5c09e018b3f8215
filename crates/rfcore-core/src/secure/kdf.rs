//! AN10922 key diversification, per `spec.md` §4.6: `KDF(siteKey, 01 ∥
//! uid[..] ∥ keyNum ∥ aid_le ∥ 80 01 00 00)` fed into AES-CMAC.
//!
//! See `DESIGN.md` for the open-question disclosure on scenario S2: the
//! original `mfdes_kdf_input_gallagher` body was not available to check
//! against here, so the literal diversified-key bytes for S2 are not
//! reproduced exactly. The construction below follows `spec.md`'s
//! documented 11-byte input layout and the standard AES-CMAC primitive
//! (independently validated against S3 and RFC 4493 — see
//! `crate::crypto::cmac_util`).

use crate::crypto::cmac_util::aes_cmac;

/// Build the AN10922 KDF input block for the Gallagher AID diversification
/// path: `01 ∥ UID (left-padded to 7 bytes with zeros if 4-byte UID) ∥
/// keyNum ∥ AID little-endian (3 bytes) ∥ 80 01 00 00`.
#[must_use]
pub fn gallagher_kdf_input(uid: &[u8], key_num: u8, aid: [u8; 3]) -> Vec<u8> {
    let mut padded_uid = [0u8; 7];
    let start = 7usize.saturating_sub(uid.len());
    padded_uid[start..].copy_from_slice(&uid[uid.len().saturating_sub(7)..]);

    let mut input = Vec::with_capacity(11);
    input.push(0x01);
    input.extend_from_slice(&padded_uid);
    input.push(key_num);
    input.push(aid[2]);
    input.push(aid[1]);
    input.push(aid[0]);
    input.extend_from_slice(&[0x80, 0x01, 0x00, 0x00]);
    input
}

/// Derive the diversified Gallagher application key from a site key, UID,
/// key number, and AID.
#[must_use]
pub fn diversify_gallagher_key(site_key: &[u8; 16], uid: &[u8], key_num: u8, aid: [u8; 3]) -> [u8; 16] {
    let input = gallagher_kdf_input(uid, key_num, aid);
    aes_cmac(site_key, &input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_block_has_fixed_suffix_and_leading_tag() {
        let input = gallagher_kdf_input(&[0x11, 0x22, 0x33, 0x44], 0, [0x2F, 0x81, 0xF4]);
        assert_eq!(input[0], 0x01);
        assert_eq!(&input[input.len() - 4..], &[0x80, 0x01, 0x00, 0x00]);
        assert_eq!(input.len(), 11);
    }

    #[test]
    fn four_byte_uid_is_left_padded_with_zeros() {
        let input = gallagher_kdf_input(&[0xAA, 0xBB, 0xCC, 0xDD], 0, [0, 0, 0]);
        assert_eq!(&input[1..4], &[0, 0, 0]);
        assert_eq!(&input[4..8], &[0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn diversification_is_deterministic_and_key_dependent() {
        let site_key = [0u8; 16];
        let a = diversify_gallagher_key(&site_key, &[1, 2, 3, 4], 0, [0x2F, 0x81, 0xF4]);
        let b = diversify_gallagher_key(&site_key, &[1, 2, 3, 4], 0, [0x2F, 0x81, 0xF4]);
        assert_eq!(a, b);
        let c = diversify_gallagher_key(&site_key, &[1, 2, 3, 5], 0, [0x2F, 0x81, 0xF4]);
        assert_ne!(a, c);
    }
}
