//! Nonce acquisition storage and the `nonces.bin` file format, `spec.md`
//! §4.9 phase (A) and the appendix's nonce-file layout.
//!
//! Grounded directly in `spec.md`'s worked file format: a 6-byte header
//! `{uid:u32 LE, trgBlockNo:u8, trgKeyType:u8}` followed by zero or more
//! 9-byte records `{nt_enc1:u32 LE, nt_enc2:u32 LE, par_enc:u8}` (high
//! nibble = first nonce's 4 parity bits, low nibble = second's). Parsed with
//! the same manual byte-cursor style `rfcore-membrane::trace` uses for its
//! own binary log format, rather than reaching for a serialization crate for
//! a fixed 9-byte record.

use rfcore_core::crc::even_parity32;

/// One pair of encrypted nonces captured from two nested authentications
/// sharing the same first byte class, plus their four-bit parity nibbles —
/// the unit `nonces.bin` stores per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoncePair {
    pub nt_enc1: u32,
    pub nt_enc2: u32,
    pub par_enc1: u8,
    pub par_enc2: u8,
}

/// A captured session: target UID/block/key type plus every captured
/// nonce pair, matching `nonces.bin`'s header + records layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NonceFile {
    pub uid: u32,
    pub trg_block_no: u8,
    pub trg_key_type: u8,
    pub records: Vec<NoncePair>,
}

impl NonceFile {
    #[must_use]
    pub fn new(uid: u32, trg_block_no: u8, trg_key_type: u8) -> Self {
        Self {
            uid,
            trg_block_no,
            trg_key_type,
            records: Vec::new(),
        }
    }

    /// Serialize to the `nonces.bin` byte layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(6 + self.records.len() * 9);
        out.extend_from_slice(&self.uid.to_le_bytes());
        out.push(self.trg_block_no);
        out.push(self.trg_key_type);
        for rec in &self.records {
            out.extend_from_slice(&rec.nt_enc1.to_le_bytes());
            out.extend_from_slice(&rec.nt_enc2.to_le_bytes());
            let par_enc = (rec.par_enc1 << 4) | (rec.par_enc2 & 0x0F);
            out.push(par_enc);
        }
        out
    }

    /// Parse a `nonces.bin` byte slice. Trailing bytes that don't form a
    /// complete 9-byte record are ignored, matching `TraceLog::read_all`'s
    /// stop-at-short-tail convention.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 6 {
            return None;
        }
        let uid = u32::from_le_bytes(bytes[0..4].try_into().ok()?);
        let trg_block_no = bytes[4];
        let trg_key_type = bytes[5];
        let mut records = Vec::new();
        let mut pos = 6usize;
        while pos + 9 <= bytes.len() {
            let nt_enc1 = u32::from_le_bytes(bytes[pos..pos + 4].try_into().ok()?);
            let nt_enc2 = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().ok()?);
            let par_enc = bytes[pos + 8];
            records.push(NoncePair {
                nt_enc1,
                nt_enc2,
                par_enc1: (par_enc >> 4) & 0x0F,
                par_enc2: par_enc & 0x0F,
            });
            pos += 9;
        }
        Some(Self {
            uid,
            trg_block_no,
            trg_key_type,
            records,
        })
    }
}

/// Sum(a8) of a first byte class: the count, over every observed second
/// byte for that class, of `evenparity((nt_enc ∧ 0xFF000000) ∨ (parity &
/// 0x04))` being true, per `spec.md` §4.9 phase (A)'s defining formula.
/// `second_bytes` is each record's `(nt_enc2, par_enc2)` observed for one
/// first-byte class.
#[must_use]
pub fn sum_a8_count(second_bytes: &[(u32, u8)]) -> u32 {
    second_bytes
        .iter()
        .filter(|&&(nt_enc, parity)| {
            let masked = (nt_enc & 0xFF00_0000) | u32::from(parity & 0x04);
            even_parity32(masked)
        })
        .count() as u32
}

/// Is a first-byte class's observation count `n` and Sum(a8) count `k`
/// confident enough (probability ≥ `CONFIDENCE_THRESHOLD`) per phase (C)'s
/// hypergeometric estimate, given at least `GOOD_BYTES_REQUIRED` such
/// classes are needed before phase (A) stops acquiring? This wraps
/// [`crate::sumprop::confidence`].
#[must_use]
pub fn is_good_byte(n: u32, k: u32) -> bool {
    crate::sumprop::confidence(n, k) >= crate::CONFIDENCE_THRESHOLD
}
