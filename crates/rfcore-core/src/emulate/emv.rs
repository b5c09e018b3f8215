//! EMV contact↔contactless bridge, per `spec.md` §4.4 and scenario S5.
//!
//! Grounded directly in `armsrc/emvsim.c`'s
//! `ExecuteEMVSim`: every literal byte string below (the WTX request, the
//! file-not-found APDU, the canned PPSE and AID-select FCI templates, and
//! the GENERATE AC response template with its splice offsets) is copied
//! from that file rather than re-derived, since a reimplementation must
//! reproduce them bit-exactly (`spec.md` §1: "the HARD PART... any
//! faithful reimplementation must reproduce bit-exactly").
//!
//! The WTX round-trip in the original is driven by comparing the inbound
//! frame against the previously-sent WTX bytes (`memcmp(receivedCmd,
//! extend_resp, ...)`); this is kept as-is rather than "cleaned up" into an
//! explicit protocol flag, since the reader genuinely does echo the S(WTX)
//! frame verbatim as its acknowledgement and that echo is the only signal
//! the bridge has that it's safe to process the cached command.

use crate::crc::append_crc_a;
use crate::emulate::mifare::ApplicationHandler;

/// Abstraction over the contact-interface smart-card exchange the bridge
/// proxies through (`CmdSmartRaw` in the original). Takes a bare APDU
/// (no class-byte framing, no CRC) and returns the raw response bytes.
pub trait ContactCard {
    fn exchange(&mut self, apdu: &[u8]) -> Vec<u8>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeState {
    Default,
    SelectPay1,
    SelectPay1Aid,
    RequestingCardPdol,
    GenerateAc,
}

/// WTX S-Block: `0xF2 0x0E` + precomputed CRC-A.
const WTX_REQUEST: [u8; 4] = [0xF2, 0x0E, 0x66, 0xB8];

/// Canned "file not found" response to an OSE select.
const FILE_NOT_FOUND: [u8; 5] = [0x02, 0x6A, 0x82, 0x93, 0x2F];

/// PAY1 PPSE directory response header the contact card is expected to send
/// back (sanity-checked, not strictly required to proceed).
const PAY1_PPSE_HEADER: [u8; 4] = [0x6F, 0x1E, 0x84, 0x0E];

/// Canned PPSE (`2PAY.SYS.DDF01`) FCI response, substituted whenever the
/// cached command was a PPSE select — `spec.md` §6's literal PAY2 FCI
/// template.
const PPSE_FCI_TEMPLATE: [u8; 66] = [
    0x03, 0x6F, 0x3E, 0x84, 0x0E, 0x32, 0x50, 0x41, 0x59, 0x2E, 0x53, 0x59, 0x53, 0x2E, 0x44, 0x44,
    0x46, 0x30, 0x31, 0xA5, 0x2C, 0xBF, 0x0C, 0x29, 0x61, 0x27, 0x4F, 0x07, 0xA0, 0x00, 0x00, 0x00,
    0x03, 0x10, 0x10, 0x50, 0x0A, 0x56, 0x69, 0x73, 0x61, 0x20, 0x44, 0x65, 0x62, 0x69, 0x74, 0x9F,
    0x0A, 0x08, 0x00, 0x01, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0xBF, 0x63, 0x04, 0xDF, 0x20, 0x01,
    0x80, 0x90, 0x00, 0x07, 0x9D,
];

/// Canned AID-select FCI response, substituted whenever the cached command
/// targeted the PAY1 AID directly (not via PPSE) — `armsrc/emvsim.c`'s
/// `fci_template_pay2`, distinct from the PPSE-level template above.
const AID_SELECT_FCI_TEMPLATE: [u8; 96] = [
    0x02, 0x6F, 0x5E, 0x84, 0x07, 0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10, 0xA5, 0x53, 0x50, 0x0A,
    0x56, 0x69, 0x73, 0x61, 0x20, 0x44, 0x65, 0x62, 0x69, 0x74, 0x9F, 0x38, 0x18, 0x9F, 0x66, 0x04,
    0x9F, 0x02, 0x06, 0x9F, 0x03, 0x06, 0x9F, 0x1A, 0x02, 0x95, 0x05, 0x5F, 0x2A, 0x02, 0x9A, 0x03,
    0x9C, 0x01, 0x9F, 0x37, 0x04, 0x5F, 0x2D, 0x02, 0x65, 0x6E, 0x9F, 0x11, 0x01, 0x01, 0x9F, 0x12,
    0x0A, 0x56, 0x69, 0x73, 0x61, 0x20, 0x44, 0x65, 0x62, 0x69, 0x74, 0xBF, 0x0C, 0x13, 0x9F, 0x5A,
    0x05, 0x31, 0x08, 0x26, 0x08, 0x26, 0x9F, 0x0A, 0x08, 0x00, 0x01, 0x05, 0x01, 0x00, 0x00, 0x00,
    0x00, 0x90, 0x00, 0xD8, 0x15,
];

/// GENERATE AC response template; `template[0]` is overwritten with the
/// class byte, `[60..62]` with the transaction counter, `[45..53]` with the
/// cryptogram, `[35..42]` with the issuer application data, and the final
/// two bytes with a freshly computed CRC-A.
const GENERATE_AC_TEMPLATE: [u8; 78] = [
    0x00, 0x77, 0x47, 0x82, 0x02, 0x39, 0x00, 0x57, 0x13, 0x47, 0x62, 0x28, 0x00, 0x05, 0x93, 0x38,
    0x64, 0xD2, 0x70, 0x92, 0x01, 0x00, 0x00, 0x01, 0x42, 0x00, 0x00, 0x0F, 0x5F, 0x34, 0x01, 0x00,
    0x9F, 0x10, 0x07, 0x06, 0x01, 0x12, 0x03, 0xA0, 0x20, 0x00, 0x9F, 0x26, 0x08, 0x56, 0xCB, 0x4E,
    0xE1, 0xA4, 0xEF, 0xAC, 0x74, 0x9F, 0x27, 0x01, 0x80, 0x9F, 0x36, 0x02, 0x00, 0x07, 0x9F, 0x6C,
    0x02, 0x3E, 0x00, 0x9F, 0x6E, 0x04, 0x20, 0x70, 0x00, 0x00, 0x90, 0x00, 0xFF, 0xFF,
];

/// GPO priming request issued to the contact card before a GENERATE AC,
/// whose response is discarded (`spec.md` §4.4 item 2).
const PDOL_PRIMING_REQUEST: [u8; 7] = [0x80, 0xA8, 0x00, 0x00, 0x02, 0x83, 0x00];

/// The EMV contact↔contactless bridge, per `spec.md` §4.4.
pub struct EmvBridge<C: ContactCard> {
    state: BridgeState,
    cached_command: Vec<u8>,
    contact: C,
}

impl<C: ContactCard> EmvBridge<C> {
    #[must_use]
    pub fn new(contact: C) -> Self {
        Self {
            state: BridgeState::Default,
            cached_command: Vec::new(),
            contact,
        }
    }

    fn handle_frame(&mut self, frame: &[u8]) -> Vec<u8> {
        if frame.len() > 8 && &frame[6..9] == b"OSE" {
            return FILE_NOT_FOUND.to_vec();
        }

        if frame == WTX_REQUEST {
            return self.process_cached_command();
        }

        let mut cmd = frame.to_vec();

        // GPO -> repackage as GENERATE AC (class byte rewritten to 0x03,
        // INS to 0xAE, and the PDOL response tail shifted into place). A
        // 2-byte placeholder is appended so that `process_cached_command`'s
        // universal `cmd[1..cmd.len() - 2]` CRC strip (every other cached
        // command ends in a real CRC-A) still forwards the full 34-byte
        // GENERATE AC body instead of chopping off its last two real bytes.
        if cmd.len() > 5 && cmd[2] == 0xA8 {
            self.state = BridgeState::GenerateAc;
            let mut repackaged = vec![0x03, 0x80, 0xAE, 0x80, 0x00, 0x1D];
            repackaged.extend_from_slice(&cmd[6..6 + 29.min(cmd.len().saturating_sub(6))]);
            repackaged.resize(6 + 29, 0);
            repackaged.extend_from_slice(&[0x00, 0x00]);
            cmd = repackaged;
        }

        // "2PAY.SYS.DDF01" select -> rewrite to "1PAY.SYS.DDF01" and cache
        // the mutated command, so the forwarded select targets the contact
        // card's actual (contact) payment environment.
        if cmd.len() >= 9 && &cmd[6..9] == b"2PA" {
            cmd[6] = b'1';
            self.state = BridgeState::SelectPay1;
        }

        // Selecting a short (application-level) AID directly.
        if cmd.len() > 5 && cmd[2] == 0xA4 && cmd[5] == 0x07 {
            self.state = BridgeState::SelectPay1Aid;
        }

        self.cached_command = cmd;
        WTX_REQUEST.to_vec()
    }

    fn process_cached_command(&mut self) -> Vec<u8> {
        let cmd = self.cached_command.clone();
        if cmd.len() < 3 {
            return FILE_NOT_FOUND.to_vec();
        }

        if self.state == BridgeState::GenerateAc {
            self.state = BridgeState::RequestingCardPdol;
            let _ = self.contact.exchange(&PDOL_PRIMING_REQUEST);
        }

        let class_byte = cmd[0];
        let body = &cmd[1..cmd.len() - 2];
        let mut response = self.contact.exchange(body);

        if self.state == BridgeState::SelectPay1 {
            if response.len() < PAY1_PPSE_HEADER.len() + 1
                || response[1..1 + PAY1_PPSE_HEADER.len()] != PAY1_PPSE_HEADER
            {
                return FILE_NOT_FOUND.to_vec();
            }
            response = PPSE_FCI_TEMPLATE.to_vec();
            self.state = BridgeState::Default;
            return response;
        }

        if response.len() > 1 && response[1] == 0x77 {
            response = self.rewrite_generate_ac_response(class_byte, &response);
            self.state = BridgeState::Default;
            return response;
        }

        if self.state == BridgeState::SelectPay1Aid {
            self.state = BridgeState::Default;
            return AID_SELECT_FCI_TEMPLATE.to_vec();
        }

        response
    }

    /// Splice the GENERATE AC response's transaction counter, cryptogram,
    /// and issuer application data into [`GENERATE_AC_TEMPLATE`], then
    /// recompute CRC-A over the class-byte-stripped template.
    fn rewrite_generate_ac_response(&self, class_byte: u8, response: &[u8]) -> Vec<u8> {
        let mut template = GENERATE_AC_TEMPLATE.to_vec();
        template[0] = class_byte;
        if response.len() >= 12 {
            template[60..62].copy_from_slice(&response[10..12]);
        }
        if response.len() >= 23 {
            template[45..53].copy_from_slice(&response[15..23]);
        }
        if response.len() >= 33 {
            template[35..42].copy_from_slice(&response[26..33]);
        }
        // `AddCrc14A(&template[0], responseToReader_len - 2)` in the original
        // covers the class byte despite a stale comment above it claiming
        // otherwise ("doesn't include the class bit at the beginning") —
        // every other canned response here (e.g. `FILE_NOT_FOUND`) is CRC'd
        // the same way, over the whole frame including the class byte.
        let crc_body = &template[..template.len() - 2];
        append_crc_a(crc_body)
    }
}

impl<C: ContactCard> ApplicationHandler for EmvBridge<C> {
    fn handle_apdu(&mut self, payload: &[u8]) -> Vec<u8> {
        self.handle_frame(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCard {
        responses: std::collections::VecDeque<Vec<u8>>,
    }

    impl ContactCard for FakeCard {
        fn exchange(&mut self, _apdu: &[u8]) -> Vec<u8> {
            self.responses.pop_front().unwrap_or_default()
        }
    }

    /// Like [`FakeCard`], but records every APDU it was asked to forward, so
    /// tests can inspect exactly what the bridge sent to the contact card.
    struct RecordingCard {
        responses: std::collections::VecDeque<Vec<u8>>,
        sent: Vec<Vec<u8>>,
    }

    impl ContactCard for RecordingCard {
        fn exchange(&mut self, apdu: &[u8]) -> Vec<u8> {
            self.sent.push(apdu.to_vec());
            self.responses.pop_front().unwrap_or_default()
        }
    }

    /// Scenario S5: PPSE select gets a WTX, then the canned PAY2 FCI.
    #[test]
    fn ppse_select_is_rewritten_via_wtx_roundtrip() {
        let card = FakeCard {
            responses: [vec![
                0x6F, 0x1E, 0x84, 0x0E, 0x31, 0x50, 0x41, 0x59, 0x2E, 0x53, 0x59, 0x53, 0x2E, 0x44,
                0x44, 0x46, 0x30, 0x31,
            ]]
            .into(),
        };
        let mut bridge = EmvBridge::new(card);
        let ppse_select = append_crc_a(&[
            0x00, 0xA4, 0x04, 0x00, 0x0E, 0x32, 0x50, 0x41, 0x59, 0x2E, 0x53, 0x59, 0x53, 0x2E,
            0x44, 0x44, 0x46, 0x30, 0x31,
        ]);
        let mut framed = vec![0x03];
        framed.extend_from_slice(&ppse_select);

        let wtx = bridge.handle_frame(&framed);
        assert_eq!(wtx, WTX_REQUEST.to_vec());

        let final_resp = bridge.handle_frame(&WTX_REQUEST);
        assert_eq!(final_resp, PPSE_FCI_TEMPLATE.to_vec());
    }

    #[test]
    fn ose_select_is_answered_immediately_without_wtx() {
        let card = FakeCard {
            responses: Default::default(),
        };
        let mut bridge = EmvBridge::new(card);
        let frame = [0x00, 0xA4, 0x04, 0x00, 0x06, b'O', b'S', b'E', 0x00, 0x00];
        assert_eq!(bridge.handle_frame(&frame), FILE_NOT_FOUND.to_vec());
    }

    /// `spec.md` §4.4 item 2: the forwarded GENERATE AC body must be
    /// `80 AE 80 00 1D` + all 29 bytes of the PDOL response tail, not a
    /// truncated 27-byte tail. Drives the repackaging through `handle_frame`
    /// itself (a realistic GPO frame), rather than hand-constructing
    /// `cached_command` the way `generate_ac_response_is_spliced_into_template`
    /// does, so the CRC-strip interaction in `process_cached_command` is
    /// actually exercised.
    #[test]
    fn gpo_frame_repackaging_forwards_the_full_pdol_tail_through_handle_frame() {
        let card = RecordingCard {
            responses: Default::default(),
            sent: Vec::new(),
        };
        let mut bridge = EmvBridge::new(card);

        let pdol_tail: Vec<u8> = (1u8..=29).collect();
        let mut gpo_frame = vec![0x03, 0x80, 0xA8, 0x00, 0x00, 0x02];
        gpo_frame.extend_from_slice(&pdol_tail);

        let wtx = bridge.handle_frame(&gpo_frame);
        assert_eq!(wtx, WTX_REQUEST.to_vec());
        assert_eq!(bridge.state, BridgeState::GenerateAc);

        let _ = bridge.handle_frame(&WTX_REQUEST);

        // sent[0] is the discarded PDOL priming request; sent[1] is the
        // repackaged GENERATE AC body.
        assert_eq!(bridge.contact.sent.len(), 2);
        let generate_ac_body = &bridge.contact.sent[1];
        assert_eq!(generate_ac_body.len(), 34);
        assert_eq!(&generate_ac_body[..5], &[0x80, 0xAE, 0x80, 0x00, 0x1D]);
        assert_eq!(&generate_ac_body[5..], pdol_tail.as_slice());
    }

    #[test]
    fn generate_ac_response_is_spliced_into_template() {
        let card = FakeCard {
            responses: Default::default(),
        };
        let mut bridge = EmvBridge::new(card);
        bridge.state = BridgeState::GenerateAc;
        bridge.cached_command = {
            let mut v = vec![0x03, 0x80, 0xAE];
            v.extend_from_slice(&[0u8; 40]);
            v
        };

        let mut contact_response = vec![0u8; 33];
        contact_response[1] = 0x77;
        contact_response[10] = 0xAA;
        contact_response[11] = 0xBB;
        for i in 0..8 {
            contact_response[15 + i] = 0xC0 + i as u8;
        }
        for i in 0..7 {
            contact_response[26 + i] = 0xD0 + i as u8;
        }
        bridge.contact.responses.push_back(contact_response.clone());

        let out = bridge.process_cached_command();
        assert_eq!(out[0], 0x03);
        assert_eq!(&out[60..62], &[0xAA, 0xBB]);
        assert_eq!(&out[45..53], &[0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7]);
        assert_eq!(&out[35..42], &[0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6]);
        let crc_body = &out[1..out.len() - 2];
        assert_eq!(crate::crc::crc_a(&append_crc_a(crc_body)), 0);
    }
}
