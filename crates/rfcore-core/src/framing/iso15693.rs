//! ISO 15693 framing: CRC (shared with CRC-B, see `crate::crc::crc_15693`)
//! and the sub-carrier modulation mode flags used by the reader/tag select
//! path. The PPM/Manchester waveform encoding itself is a physical-layer
//! concern outside `spec.md`'s scope (§1); this module covers the
//! byte-level framing immediately above it, mirroring `framing::iso14443a`.

use crate::crc::crc_15693;

/// Sub-carrier and data-rate flags carried in an ISO 15693 request's flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFlags {
    pub dual_subcarrier: bool,
    pub high_data_rate: bool,
    pub inventory: bool,
}

impl RequestFlags {
    #[must_use]
    pub fn to_byte(self) -> u8 {
        let mut b = 0u8;
        if self.dual_subcarrier {
            b |= 0x01;
        }
        if self.high_data_rate {
            b |= 0x02;
        }
        if self.inventory {
            b |= 0x04;
        }
        b
    }
}

/// Append the little-endian CRC-15693 of `data` to `data`.
#[must_use]
pub fn append_crc_15693(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    out.extend_from_slice(&crc_15693(data).to_le_bytes());
    out
}

/// Verify the trailing two bytes of `frame` are a valid CRC-15693 over the
/// preceding bytes. ISO 15693's CRC, unlike CRC-A, does not self-cancel to
/// zero over (data ∥ crc) because of its non-zero final XOR; the residue
/// constant below is the fixed value produced by any valid (data, crc) pair.
#[must_use]
pub fn crc_ok(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }
    const RESIDUE: u16 = 0xF0B8;
    crc_15693(frame) == RESIDUE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_flags_pack_into_byte() {
        let flags = RequestFlags {
            dual_subcarrier: true,
            high_data_rate: true,
            inventory: false,
        };
        assert_eq!(flags.to_byte(), 0x03);
    }

    #[test]
    fn appended_crc_round_trips() {
        let data = [0x01, 0x02, 0x03];
        let framed = append_crc_15693(&data);
        assert!(crc_ok(&framed));
    }
}
