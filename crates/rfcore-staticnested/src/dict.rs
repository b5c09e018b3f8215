//! `keys.dic` dictionary export, `spec.md` §4.10 step 5.
//!
//! Grounded in `staticnested_0nt.c`'s `main`, which opens `keys.dic` and
//! writes one candidate key per line as twelve lowercase hex digits
//! (`fprintf(fptr, "%012" PRIx64 "\n", keys[i][j])`).

use std::io::Write;

use rfcore_core::error::{Pm3Error, Pm3Result};

/// Render recovered 48-bit keys as `keys.dic` lines, one twelve-digit
/// lowercase hex key per line.
#[must_use]
pub fn format_dic(keys: &[u64]) -> String {
    let mut out = String::with_capacity(keys.len() * 13);
    for key in keys {
        out.push_str(&format!("{key:012x}\n"));
    }
    out
}

/// Write recovered keys to `writer` in `keys.dic` format.
pub fn write_dic<W: Write>(writer: &mut W, keys: &[u64]) -> Pm3Result<()> {
    writer
        .write_all(format_dic(keys).as_bytes())
        .map_err(|_| Pm3Error::EFile)
}
