//! Card-emulation state machines, per `spec.md` §1 item 2 / §4.4 / §4.5: a
//! generic MIFARE-compatible substrate (`mifare`) that higher-level
//! application emulators plug into, specifically the EMV contact↔contactless
//! bridge (`emv`) and the HID Seos secure-file emulator (`seos`).

pub mod emv;
pub mod mifare;
pub mod seos;

pub use mifare::{ApplicationHandler, CardEmulator};
