//! `Iso7816Apdu`: a thin CLA/INS/P1/P2/Lc/data/Le view shared by the EMV
//! bridge and the Seos emulator, per `SPEC_FULL.md` §3 — grounded in
//! `client/src/pm3_binlib.c` (byte-slicing helpers
//! for APDU construction) and `include/desfire.h`'s APDU wrapping constants.

use crate::error::Pm3Error;

/// A parsed command APDU (case 1-4 short form; extended-length APDUs are
/// not needed by the emulators in scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso7816Apdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
    pub le: Option<u8>,
}

impl Iso7816Apdu {
    /// Parse a raw command APDU byte string (short form only).
    pub fn parse(raw: &[u8]) -> Result<Self, Pm3Error> {
        if raw.len() < 4 {
            return Err(Pm3Error::EApduEncodeFail(
                "APDU shorter than header".into(),
            ));
        }
        let (cla, ins, p1, p2) = (raw[0], raw[1], raw[2], raw[3]);
        match raw.len() {
            4 => Ok(Self {
                cla,
                ins,
                p1,
                p2,
                data: vec![],
                le: None,
            }),
            5 => Ok(Self {
                cla,
                ins,
                p1,
                p2,
                data: vec![],
                le: Some(raw[4]),
            }),
            _ => {
                let lc = raw[4] as usize;
                if raw.len() < 5 + lc {
                    return Err(Pm3Error::EApduEncodeFail("Lc exceeds APDU length".into()));
                }
                let data = raw[5..5 + lc].to_vec();
                let le = if raw.len() == 5 + lc + 1 {
                    Some(raw[5 + lc])
                } else {
                    None
                };
                Ok(Self {
                    cla,
                    ins,
                    p1,
                    p2,
                    data,
                    le,
                })
            }
        }
    }

    /// Serialize back to the wire format.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.cla, self.ins, self.p1, self.p2];
        if !self.data.is_empty() {
            out.push(self.data.len() as u8);
            out.extend_from_slice(&self.data);
        }
        if let Some(le) = self.le {
            out.push(le);
        }
        out
    }

    /// Wrap DESFire native command bytes into an ISO 7816 APDU: CLA=0x90,
    /// P1=P2=0x00, Lc=payload length, Le=0x00, per `spec.md` §6.
    #[must_use]
    pub fn wrap_desfire_native(ins: u8, payload: &[u8]) -> Self {
        Self {
            cla: 0x90,
            ins,
            p1: 0x00,
            p2: 0x00,
            data: payload.to_vec(),
            le: Some(0x00),
        }
    }
}

/// A response APDU: data plus a two-byte status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseApdu {
    pub data: Vec<u8>,
    pub sw: u16,
}

impl ResponseApdu {
    #[must_use]
    pub const fn ok(data: Vec<u8>) -> Self {
        Self { data, sw: 0x9000 }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.sw == 0x9000
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        out.extend_from_slice(&self.sw.to_be_bytes());
        out
    }

    pub fn parse(raw: &[u8]) -> Result<Self, Pm3Error> {
        if raw.len() < 2 {
            return Err(Pm3Error::EApduEncodeFail(
                "response shorter than status word".into(),
            ));
        }
        let (data, sw_bytes) = raw.split_at(raw.len() - 2);
        Ok(Self {
            data: data.to_vec(),
            sw: u16::from_be_bytes([sw_bytes[0], sw_bytes[1]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_reserializes_case3_apdu() {
        let raw = [0x00, 0xA4, 0x04, 0x00, 0x02, 0x3F, 0x00];
        let apdu = Iso7816Apdu::parse(&raw).unwrap();
        assert_eq!(apdu.ins, 0xA4);
        assert_eq!(apdu.data, vec![0x3F, 0x00]);
        assert_eq!(apdu.to_bytes(), raw);
    }

    #[test]
    fn wraps_desfire_native_command() {
        let apdu = Iso7816Apdu::wrap_desfire_native(0x5A, &[0xF4, 0x81, 0x2F]);
        assert_eq!(apdu.cla, 0x90);
        assert_eq!(apdu.data, vec![0xF4, 0x81, 0x2F]);
        assert_eq!(apdu.le, Some(0x00));
    }

    #[test]
    fn response_round_trips() {
        let resp = ResponseApdu::ok(vec![0x01, 0x02]);
        let raw = resp.to_bytes();
        assert_eq!(ResponseApdu::parse(&raw).unwrap(), resp);
    }
}
