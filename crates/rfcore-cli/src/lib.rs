//! Library half of the `hf gallagher` CLI surface, `spec.md` §6's "CLI
//! surface (the only part of CLI in scope because it anchors the core's
//! observable behavior)".
//!
//! Split into a library and a thin binary: this crate holds the testable
//! logic, `main.rs` is a thin `clap` dispatcher. Since live reader/transport
//! I/O is explicitly out
//! of scope (`spec.md` §1's OUT OF SCOPE list: "USB/BT serial transport...
//! the core assumes a byte-frame transport to the reader"), the commands
//! that would normally drive a physical card (`reader`, `clone`, `delete`)
//! operate on a small on-disk CAD snapshot instead of a live DESFire session
//! — see `DESIGN.md`'s open-question entry for this choice.

use rfcore_core::cad::{
    gallagher_decode_creds, gallagher_is_valid_creds, gallagher_storage_block, CadDirectory,
    CadEntry, GallagherCredentials, CAD_AID,
};
use rfcore_core::error::{Pm3Error, Pm3Result};
use rfcore_core::secure::kdf::diversify_gallagher_key;

/// Default site key used when `--sitekey` is omitted: 16 zero bytes, the
/// conventional "blank card" key. Not derived from any retrieved source —
/// the original client's default key literal was not present in the
/// upstream sources available here. See `DESIGN.md`.
pub const DEFAULT_SITE_KEY: [u8; 16] = [0u8; 16];

/// Default on-disk CAD snapshot path used by `reader`/`clone`/`delete` when
/// `--state` is not given.
pub const DEFAULT_CAD_STATE_PATH: &str = "gallagher_cad_state.bin";

/// Parse a hex string (even length, no `0x` prefix expected but tolerated)
/// into bytes.
pub fn parse_hex(input: &str) -> Pm3Result<Vec<u8>> {
    let trimmed = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")).unwrap_or(input);
    if trimmed.len() % 2 != 0 {
        return Err(Pm3Error::InvArg(format!(
            "hex string must have even length: {input}"
        )));
    }
    (0..trimmed.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&trimmed[i..i + 2], 16)
                .map_err(|_| Pm3Error::InvArg(format!("invalid hex byte in: {input}")))
        })
        .collect()
}

/// Render bytes as a contiguous uppercase hex string.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn parse_key16(input: &str) -> Pm3Result<[u8; 16]> {
    let bytes = parse_hex(input)?;
    bytes
        .try_into()
        .map_err(|_| Pm3Error::InvArg("key must be exactly 16 bytes".into()))
}

fn parse_aid3(input: &str) -> Pm3Result<[u8; 3]> {
    let bytes = parse_hex(input)?;
    bytes
        .try_into()
        .map_err(|_| Pm3Error::InvArg("AID must be exactly 3 bytes".into()))
}

fn site_key(hex: Option<&str>) -> Pm3Result<[u8; 16]> {
    match hex {
        Some(h) => parse_key16(h),
        None => Ok(DEFAULT_SITE_KEY),
    }
}

fn load_cad(path: &std::path::Path) -> CadDirectory {
    match std::fs::read(path) {
        Ok(bytes) => CadDirectory::from_bytes(bytes),
        Err(_) => CadDirectory::new(),
    }
}

fn save_cad(path: &std::path::Path, cad: &CadDirectory) -> Pm3Result<()> {
    std::fs::write(path, cad.as_bytes())
        .map_err(|e| Pm3Error::EFile(format!("could not write CAD state to {}: {e}", path.display())))
}

/// `hf gallagher decode --data HEX`: decode a Gallagher credential block,
/// per scenario S1.
pub fn decode(data_hex: &str) -> Pm3Result<String> {
    let bytes = parse_hex(data_hex)?;
    if bytes.len() < 8 {
        return Err(Pm3Error::InvArg(
            "decode requires at least 8 bytes of credential data".into(),
        ));
    }
    let mut first8 = [0u8; 8];
    first8.copy_from_slice(&bytes[..8]);
    let creds = gallagher_decode_creds(&first8);
    Ok(format!(
        "region: {} (0x{:X})\nfacility: {}\ncard number: {}\nissue level: {}",
        region_letter(creds.region_code),
        creds.region_code,
        creds.facility_code,
        creds.card_number,
        creds.issue_level
    ))
}

fn region_letter(region: u8) -> char {
    (b'A' + region.min(25)) as char
}

/// `hf gallagher diversify --aid HEX [--keynum N] [--uid HEX] [--sitekey HEX]`.
pub fn diversify(aid_hex: &str, key_num: u8, uid_hex: Option<&str>, sitekey_hex: Option<&str>) -> Pm3Result<String> {
    let aid = parse_aid3(aid_hex)?;
    let uid = match uid_hex {
        Some(h) => parse_hex(h)?,
        None => vec![0u8; 7],
    };
    let site_key = site_key(sitekey_hex)?;
    let derived = diversify_gallagher_key(&site_key, &uid, key_num, aid);
    Ok(to_hex(&derived))
}

/// `hf gallagher reader [--aid HEX] [--sitekey HEX] [-@]`: read the current
/// CAD snapshot (see module docs for why this is file-backed, not live).
pub fn reader(state_path: &std::path::Path, aid_filter: Option<&str>) -> Pm3Result<String> {
    let cad = load_cad(state_path);
    let entries = cad.entries();
    let aid_filter = aid_filter.map(parse_aid3).transpose()?;
    let mut lines = vec![format!("CAD AID 0x{CAD_AID:06X}, {} file(s), {} entr{}", cad.file_count(), entries.len(), if entries.len() == 1 { "y" } else { "ies" })];
    for entry in &entries {
        if let Some(filter) = aid_filter {
            let filter_aid = (u32::from(filter[0]) << 16) | (u32::from(filter[1]) << 8) | u32::from(filter[2]);
            if filter_aid != entry.aid {
                continue;
            }
        }
        lines.push(format!(
            "region={} facility={} aid=0x{:06X}",
            entry.region, entry.facility, entry.aid
        ));
    }
    Ok(lines.join("\n"))
}

/// `hf gallagher clone --rc N --fc N --cn N --il N [...]`: build a
/// credential, its storage block, and (unless `--nocadupdate`) register the
/// facility in the CAD snapshot.
#[allow(clippy::too_many_arguments)]
pub fn clone_credential(
    state_path: &std::path::Path,
    region_code: u8,
    facility_code: u16,
    card_number: u32,
    issue_level: u8,
    aid_hex: Option<&str>,
    no_cad_update: bool,
) -> Pm3Result<String> {
    if !gallagher_is_valid_creds(
        u64::from(region_code),
        u64::from(facility_code),
        u64::from(card_number),
        u64::from(issue_level),
    ) {
        return Err(Pm3Error::InvArg(
            "credential fields exceed Gallagher field widths".into(),
        ));
    }
    let creds = GallagherCredentials {
        region_code,
        facility_code,
        card_number,
        issue_level,
    };
    let block = gallagher_storage_block(&creds);

    let mut report = format!("storage block: {}", to_hex(&block));
    if !no_cad_update {
        let aid = match aid_hex {
            Some(h) => {
                let bytes = parse_aid3(h)?;
                (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2])
            }
            None => CAD_AID,
        };
        let mut cad = load_cad(state_path);
        cad.add(CadEntry {
            region: region_code,
            facility: facility_code,
            aid,
        })?;
        save_cad(state_path, &cad)?;
        report.push_str(&format!("\nCAD updated: added region={region_code} facility={facility_code} aid=0x{aid:06X}"));
    }
    Ok(report)
}

/// `hf gallagher delete --aid HEX [...]`: remove a facility's AID entry from
/// the CAD snapshot.
pub fn delete_credential(state_path: &std::path::Path, aid_hex: &str, no_cad_update: bool) -> Pm3Result<String> {
    let aid_bytes = parse_aid3(aid_hex)?;
    let aid = (u32::from(aid_bytes[0]) << 16) | (u32::from(aid_bytes[1]) << 8) | u32::from(aid_bytes[2]);
    if no_cad_update {
        return Ok(format!("would delete AID 0x{aid:06X} (--nocadupdate: CAD left unchanged)"));
    }
    let mut cad = load_cad(state_path);
    cad.remove(aid)?;
    save_cad(state_path, &cad)?;
    Ok(format!("CAD updated: removed AID 0x{aid:06X}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_round_trips_through_to_hex() {
        let bytes = parse_hex("A3B4B0C151B0A31B").unwrap();
        assert_eq!(to_hex(&bytes), "A3B4B0C151B0A31B");
    }

    #[test]
    fn parse_hex_rejects_odd_length() {
        assert!(parse_hex("ABC").is_err());
    }

    #[test]
    fn decode_matches_scenario_s1() {
        let out = decode("A3B4B0C151B0A31B").unwrap();
        assert!(out.contains("region: D (0x3)"));
        assert!(out.contains("facility: 6885"));
        assert!(out.contains("card number: 223783"));
        assert!(out.contains("issue level: 7"));
    }

    #[test]
    fn clone_then_reader_reports_the_new_entry() {
        let dir = std::env::temp_dir().join(format!("rfcore-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let state_path = dir.join("cad.bin");
        let _ = std::fs::remove_file(&state_path);

        clone_credential(&state_path, 3, 6885, 223_783, 7, Some("2F81F4"), false).unwrap();
        let report = reader(&state_path, None).unwrap();
        assert!(report.contains("aid=0x2F81F4"));

        let _ = std::fs::remove_file(&state_path);
    }

    #[test]
    fn delete_removes_a_previously_cloned_entry() {
        let dir = std::env::temp_dir().join(format!("rfcore-cli-test-del-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let state_path = dir.join("cad.bin");
        let _ = std::fs::remove_file(&state_path);

        clone_credential(&state_path, 1, 100, 1, 0, Some("2081F4"), false).unwrap();
        delete_credential(&state_path, "2081F4", false).unwrap();
        let report = reader(&state_path, None).unwrap();
        assert!(!report.contains("aid=0x2081F4"));

        let _ = std::fs::remove_file(&state_path);
    }
}
