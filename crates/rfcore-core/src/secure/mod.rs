//! Secure-channel layer: ISO 7816 APDU/TLV plumbing, the DESFire d40/EV1/
//! EV2/LRP secure channel, AN10922 key diversification, and LRP, per
//! `spec.md` §4.6/§4.8.

pub mod apdu;
pub mod desfire;
pub mod kdf;
pub mod lrp;
pub mod tlv;

pub use apdu::{Iso7816Apdu, ResponseApdu};
pub use desfire::{Algorithm, CommMode, SecureSession};
