//! Gallagher Card Application Directory (CAD) and cardholder-credential
//! encoding, per `spec.md` §4.7 and the credential layout in §3's
//! `GallagherCredentials` entity.
//!
//! Grounded in `client/src/cmdhfgallagher.c`'s
//! `hfgal_read_cad`/`hfgal_add_aid_to_cad`/`hfgal_remove_aid_from_cad` and
//! `cad_aid_byte_to_uint`/`cad_aid_uint_to_byte`. Those functions drive a
//! live DESFire session (`DesfireContext_t`); this module keeps the pure
//! data-layout logic — the read/add/remove algorithm over a flat byte
//! buffer — separate from the card transport, which is outside this crate's
//! scope (`spec.md` §1: protocol/crypto core, not a full client).
//!
//! `gallaghercore.c`, which holds `gallagher_encode_creds`/
//! `gallagher_decode_creds`'s actual bit-packing body, was not present in
//! the upstream sources available here (only its header). The credential layout below is a
//! documented open-question resolution — see `DESIGN.md`'s "S1" entry —
//! not a reproduction of the original's exact bit order.

use crate::error::Pm3Error;

/// One Card Application Directory row: `{region, facility, aid}`, stored
/// CAD-order (AID most-significant byte first — the reverse of the
/// standard DESFire wire encoding, which sends the AID least-significant
/// byte first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadEntry {
    pub region: u8,
    pub facility: u16,
    pub aid: u32,
}

const ENTRY_SIZE: usize = 6;
const ENTRIES_PER_FILE: usize = 6;
const FILE_SIZE: usize = ENTRY_SIZE * ENTRIES_PER_FILE;
const MAX_FILES: usize = 3;
const MAX_ENTRIES: usize = ENTRIES_PER_FILE * MAX_FILES;

/// CAD application ID, per `spec.md` §4.7.
pub const CAD_AID: u32 = 0x2F_81_F4;

/// AID -> CAD-order 3 bytes (most-significant byte first), per
/// `cad_aid_uint_to_byte`.
#[must_use]
pub fn aid_to_cad_bytes(aid: u32) -> [u8; 3] {
    [(aid >> 16) as u8, (aid >> 8) as u8, aid as u8]
}

/// CAD-order 3 bytes -> AID, per `cad_aid_byte_to_uint`.
#[must_use]
pub fn cad_bytes_to_aid(bytes: &[u8; 3]) -> u32 {
    (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
}

fn entry_to_bytes(entry: &CadEntry) -> [u8; ENTRY_SIZE] {
    let mut out = [0u8; ENTRY_SIZE];
    out[0] = entry.region;
    out[1] = (entry.facility >> 8) as u8;
    out[2] = entry.facility as u8;
    out[3..6].copy_from_slice(&aid_to_cad_bytes(entry.aid));
    out
}

fn entry_from_bytes(bytes: &[u8]) -> CadEntry {
    let facility = (u16::from(bytes[1]) << 8) | u16::from(bytes[2]);
    let aid = cad_bytes_to_aid(&[bytes[3], bytes[4], bytes[5]]);
    CadEntry {
        region: bytes[0],
        facility,
        aid,
    }
}

/// Up to 3 DESFire files of 36 bytes each (`spec.md` §4.7: "files grow in
/// 36-byte blocks of 6 entries each"), held as one flat in-memory buffer
/// mirroring `hfgal_read_cad`'s `dest_buf`.
#[derive(Debug, Clone, Default)]
pub struct CadDirectory {
    buf: Vec<u8>,
}

impl CadDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Reconstruct from a raw byte buffer (as read off the card, file by
    /// file, 36 bytes each).
    #[must_use]
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of files currently backing this directory (0-3).
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.buf.len().div_ceil(FILE_SIZE)
    }

    /// Entries up to (not including) the first all-zero 6-byte row, per
    /// `hfgal_read_cad`'s "count until we hit a NULL entry".
    #[must_use]
    pub fn entries(&self) -> Vec<CadEntry> {
        self.buf
            .chunks(ENTRY_SIZE)
            .take_while(|chunk| chunk.iter().any(|&b| b != 0))
            .map(entry_from_bytes)
            .collect()
    }

    /// Add a new entry, per `hfgal_add_aid_to_cad`: reject a duplicate
    /// region+facility, append at the next free slot, growing the buffer by
    /// a whole file when the slot is the first of a new file.
    pub fn add(&mut self, entry: CadEntry) -> Result<(), Pm3Error> {
        let entries = self.entries();
        if entries.len() >= MAX_ENTRIES {
            return Err(Pm3Error::EFatal("Card application directory is full".into()));
        }
        if let Some(existing) = entries
            .iter()
            .find(|e| e.region == entry.region && e.facility == entry.facility)
        {
            return Err(Pm3Error::EFatal(format!(
                "Facility already exists in CAD, delete or update AID {:06X}",
                existing.aid
            )));
        }

        let num_entries = entries.len();
        let entry_num = num_entries % ENTRIES_PER_FILE;
        if entry_num == 0 {
            self.buf.resize(self.buf.len() + FILE_SIZE, 0);
        }
        let offset = num_entries * ENTRY_SIZE;
        self.buf[offset..offset + ENTRY_SIZE].copy_from_slice(&entry_to_bytes(&entry));
        Ok(())
    }

    /// Remove the entry matching `aid`, per `hfgal_remove_aid_from_cad`:
    /// left-shift every later entry, zero the trailing slot, and drop the
    /// last file entirely once it would be fully empty.
    pub fn remove(&mut self, aid: u32) -> Result<(), Pm3Error> {
        let entries = self.entries();
        let entry_idx = entries.iter().position(|e| e.aid == aid).ok_or_else(|| {
            Pm3Error::InvArg(
                "Specified facility or AID does not exist in the Card Application Directory"
                    .into(),
            )
        })?;

        let num_entries = entries.len();
        let from = (entry_idx + 1) * ENTRY_SIZE;
        let to = entry_idx * ENTRY_SIZE;
        self.buf.copy_within(from.., to);
        let tail_start = self.buf.len() - ENTRY_SIZE;
        self.buf[tail_start..].fill(0);

        let delete_last_file = (num_entries - 1) % ENTRIES_PER_FILE == 0;
        if delete_last_file {
            self.buf.truncate(self.buf.len() - FILE_SIZE);
        }
        Ok(())
    }
}

/// Cardholder credential payload carried in a Gallagher MIFARE Classic
/// sector, per `spec.md` §3's `GallagherCredentials` entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GallagherCredentials {
    pub region_code: u8,
    pub facility_code: u16,
    pub card_number: u32,
    pub issue_level: u8,
}

/// Encode into the first 8 bytes of the storage block: `region` (4 bits),
/// `facility_code` (16 bits), `card_number` (24 bits), `issue_level` (4
/// bits), MSB-first, packed into 48 bits (6 bytes); the trailing 2 bytes are
/// reserved and left zero. See `DESIGN.md`'s "S1" entry for why this layout
/// (rather than the original's, whose bit-packing body is not in the
/// upstream sources available here) is what's implemented here.
#[must_use]
pub fn gallagher_encode_creds(creds: &GallagherCredentials) -> [u8; 8] {
    let region = u64::from(creds.region_code) & 0xF;
    let facility = u64::from(creds.facility_code) & 0xFFFF;
    let card = u64::from(creds.card_number) & 0x00FF_FFFF;
    let issue = u64::from(creds.issue_level) & 0xF;

    let packed: u64 = (region << 44) | (facility << 28) | (card << 4) | issue;
    let mut out = [0u8; 8];
    out[0] = (packed >> 40) as u8;
    out[1] = (packed >> 32) as u8;
    out[2] = (packed >> 24) as u8;
    out[3] = (packed >> 16) as u8;
    out[4] = (packed >> 8) as u8;
    out[5] = packed as u8;
    out
}

/// Inverse of [`gallagher_encode_creds`].
#[must_use]
pub fn gallagher_decode_creds(bytes: &[u8; 8]) -> GallagherCredentials {
    let packed: u64 = (u64::from(bytes[0]) << 40)
        | (u64::from(bytes[1]) << 32)
        | (u64::from(bytes[2]) << 24)
        | (u64::from(bytes[3]) << 16)
        | (u64::from(bytes[4]) << 8)
        | u64::from(bytes[5]);

    GallagherCredentials {
        region_code: ((packed >> 44) & 0xF) as u8,
        facility_code: ((packed >> 28) & 0xFFFF) as u16,
        card_number: ((packed >> 4) & 0x00FF_FFFF) as u32,
        issue_level: (packed & 0xF) as u8,
    }
}

/// Whether every field fits within Gallagher's field widths, per
/// `gallagher_is_valid_creds`.
#[must_use]
pub fn gallagher_is_valid_creds(region_code: u64, facility_code: u64, card_number: u64, issue_level: u64) -> bool {
    region_code <= 0x0F && facility_code <= 0xFFFF && card_number <= 0x00FF_FFFF && issue_level <= 0x0F
}

/// Build the full 16-byte storage block: `bytes[0..8]` is the encoded
/// credential, `bytes[8..16]` is its bitwise inverse, per `spec.md` §3.
#[must_use]
pub fn gallagher_storage_block(creds: &GallagherCredentials) -> [u8; 16] {
    let first = gallagher_encode_creds(creds);
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&first);
    for i in 0..8 {
        out[8 + i] = !first[i];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aid_cad_byte_order_is_reverse_of_standard() {
        let aid = 0x2F_81_F4;
        let cad_bytes = aid_to_cad_bytes(aid);
        assert_eq!(cad_bytes, [0x2F, 0x81, 0xF4]);
        assert_eq!(cad_bytes_to_aid(&cad_bytes), aid);
    }

    #[test]
    fn gallagher_credential_round_trips() {
        let creds = GallagherCredentials {
            region_code: 0x0F,
            facility_code: 0xABCD,
            card_number: 0x00AB_CDEF,
            issue_level: 0x07,
        };
        let encoded = gallagher_encode_creds(&creds);
        assert_eq!(gallagher_decode_creds(&encoded), creds);
    }

    #[test]
    fn storage_block_second_half_is_bitwise_inverse() {
        let creds = GallagherCredentials {
            region_code: 3,
            facility_code: 6885,
            card_number: 223_783,
            issue_level: 7,
        };
        let block = gallagher_storage_block(&creds);
        for i in 0..8 {
            assert_eq!(block[8 + i], !block[i]);
        }
    }

    #[test]
    fn cad_add_then_remove_is_byte_identical() {
        let mut cad = CadDirectory::new();
        let e1 = CadEntry {
            region: 1,
            facility: 100,
            aid: 0x2081F4,
        };
        let e2 = CadEntry {
            region: 2,
            facility: 200,
            aid: 0x2082F4,
        };
        cad.add(e1).unwrap();
        cad.add(e2).unwrap();
        assert_eq!(cad.entries(), vec![e1, e2]);

        cad.remove(e1.aid).unwrap();
        assert_eq!(cad.entries(), vec![e2]);
        cad.remove(e2.aid).unwrap();
        assert_eq!(cad.entries(), vec![]);
        assert!(cad.as_bytes().is_empty());
    }

    #[test]
    fn cad_add_rejects_duplicate_facility() {
        let mut cad = CadDirectory::new();
        let e1 = CadEntry {
            region: 1,
            facility: 100,
            aid: 0x2081F4,
        };
        cad.add(e1).unwrap();
        let e2 = CadEntry {
            region: 1,
            facility: 100,
            aid: 0x2082F4,
        };
        assert!(cad.add(e2).is_err());
    }

    #[test]
    fn cad_add_grows_a_new_file_every_six_entries() {
        let mut cad = CadDirectory::new();
        for i in 0..6u32 {
            cad.add(CadEntry {
                region: 0,
                facility: i as u16,
                aid: 0x200000 + i,
            })
            .unwrap();
        }
        assert_eq!(cad.file_count(), 1);
        cad.add(CadEntry {
            region: 0,
            facility: 6,
            aid: 0x200006,
        })
        .unwrap();
        assert_eq!(cad.file_count(), 2);
    }
}
