//! HID Seos secure-file emulator, per `spec.md` §4.5 and scenario S6.
//!
//! Grounded directly in `armsrc/seos.c`'s
//! `SimulateSeos`: the SELECT FILE / SELECT OID / MUTUAL AUTHENTICATE /
//! GET DATA APDU handling, the `seos_kdf` diversification construction, and
//! the session-key derivation hash layout are all carried over from there.
//! Per `spec.md` §9's design note ("APDU dispatch in EMV bridge and
//! Seos... model as a tag/length/value parser"), the manual TLV-offset
//! walks in the original are replaced with [`crate::secure::tlv`], and
//! [`crate::secure::apdu::Iso7816Apdu`] replaces the original's raw
//! `receivedCmd[n + offset]` indexing.
//!
//! Two deliberate divergences from the original source, both noted in
//! `DESIGN.md`:
//! - `spec.md`'s APDU table lists `CA` for GET DATA, but the actual source
//!   switches on `0xCB` for GET DATA (`0xDA` for PUT) and separately uses
//!   `0xCA`/`0xC2` for the unrelated S-Block DESELECT — `spec.md`'s table
//!   reuses `CA` for both, which can't be right for two different APDUs
//!   dispatched off the same byte. This follows the source's actual (and
//!   internally consistent) INS values.
//! - The source hardcodes RND.ICC to all-zero for the entire emulated
//!   session and the SELECT OID IV's "random" half to all-zero too (both
//!   backed by a literal `// TODO: Maybe actually use random data?` on the
//!   IV), whereas `spec.md` explicitly calls both "random". This follows
//!   `spec.md` and draws both from an injected [`RandomSource`], which
//!   tests can fix to a deterministic sequence.

use crate::crc::append_crc_a;
use crate::crypto::block::BlockAlgo;
use crate::crypto::cmac_util::cmac_generic;
use crate::crypto::sha::{sha1, sha256};
use crate::emulate::mifare::ApplicationHandler;
use crate::secure::apdu::Iso7816Apdu;
use crate::secure::tlv;

/// Seos AID, per `spec.md` §6.
pub const SEOS_AID: [u8; 10] = [0xA0, 0x00, 0x00, 0x04, 0x40, 0x00, 0x01, 0x01, 0x00, 0x01];

/// Source for the random bytes a real card would draw for RND.ICC and the
/// SELECT OID IV's random half. Tests use a fixed sequence for determinism.
pub trait RandomSource {
    fn fill(&mut self, buf: &mut [u8]);
}

/// `rand`-backed [`RandomSource`] for production use.
#[derive(Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn fill(&mut self, buf: &mut [u8]) {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(buf);
    }
}

/// Which block cipher secures the session, per `SEOS_ENCRYPTION_*` in
/// `include/seos_cmd.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeosAlgorithm {
    TwoK3Des,
    ThreeK3Des,
    Aes,
}

impl SeosAlgorithm {
    fn code(self) -> u8 {
        match self {
            SeosAlgorithm::TwoK3Des => 0x02,
            SeosAlgorithm::ThreeK3Des => 0x03,
            SeosAlgorithm::Aes => 0x09,
        }
    }

    fn block_size(self) -> usize {
        if self == SeosAlgorithm::Aes { 16 } else { 8 }
    }

    /// Build the keyed cipher from a 16-byte diversified key. 2K3DES keys
    /// are exactly 16 bytes already; AES-128 likewise. 3K3DES needs 24
    /// bytes, which a 16-byte KDF output can't supply directly (the
    /// original's own `diver_encr_key`/`diver_cmac_key` buffers are also
    /// only 16 bytes, so it has the same ceiling) — this repeats the first
    /// 8 bytes as the third DES key, the standard "keying option 2"
    /// (K1, K2, K1) degeneration of three-key 3DES.
    fn cipher_from_16(self, key: &[u8; 16]) -> BlockAlgo {
        match self {
            SeosAlgorithm::Aes => BlockAlgo::Aes128(*key),
            SeosAlgorithm::TwoK3Des => BlockAlgo::TwoK3Des(*key),
            SeosAlgorithm::ThreeK3Des => {
                let mut k24 = [0u8; 24];
                k24[..16].copy_from_slice(key);
                k24[16..].copy_from_slice(&key[..8]);
                BlockAlgo::ThreeK3Des(k24)
            }
        }
    }
}

/// Which hash backs session-key derivation, per `SEOS_HASHING_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeosHash {
    Sha1,
    Sha256,
}

impl SeosHash {
    fn code(self) -> u8 {
        match self {
            SeosHash::Sha1 => 0x06,
            SeosHash::Sha256 => 0x07,
        }
    }
}

/// Static per-card configuration, mirroring `seos_emulate_req_t`.
pub struct SeosConfig {
    pub algorithm: SeosAlgorithm,
    pub hash: SeosHash,
    pub uid: Vec<u8>,
    pub privenc: Vec<u8>,
    pub privmac: Vec<u8>,
    pub authkey: Vec<u8>,
    pub diversifier: Vec<u8>,
    pub data_tag: Vec<u8>,
    pub data: Vec<u8>,
    pub oid: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Default,
    OidSelected,
    Authenticated,
}

/// The HID Seos secure-file emulator, per `spec.md` §4.5.
pub struct SeosEmulator<R: RandomSource = ThreadRandom> {
    config: SeosConfig,
    rng: R,
    state: SessionState,
    rnd_icc: [u8; 8],
    rnd_ifd: [u8; 8],
    key_icc: [u8; 16],
    key_ifd: [u8; 16],
    session_encr_key: Option<BlockAlgo>,
    session_cmac_key: Option<BlockAlgo>,
}

impl<R: RandomSource> SeosEmulator<R> {
    #[must_use]
    pub fn new(config: SeosConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            state: SessionState::Default,
            rnd_icc: [0; 8],
            rnd_ifd: [0; 8],
            key_icc: [0; 16],
            key_ifd: [0; 16],
            session_encr_key: None,
            session_cmac_key: None,
        }
    }

    fn privenc_cipher(&self) -> BlockAlgo {
        self.config.algorithm.cipher_from_16(&to16(&self.config.privenc))
    }

    fn privmac_cipher(&self) -> BlockAlgo {
        self.config.algorithm.cipher_from_16(&to16(&self.config.privmac))
    }

    /// `seos_kdf`: derive a session-establishment key from the master
    /// `authkey`, keyed by direction (`forEncryption`), keyslot, OID, and
    /// diversifier. The inner CMAC always runs under AES regardless of the
    /// card's main algorithm (`"This CMAC always uses AES..."` in the
    /// original).
    fn seos_kdf(&self, for_encryption: bool, keyslot: u8) -> [u8; 16] {
        let type_of_key: u8 = if for_encryption { 0x04 } else { 0x06 };
        let oid = &self.config.oid;
        let diversifier = &self.config.diversifier;
        let mut buf = vec![0u8; 19 + oid.len() + diversifier.len()];
        buf[11] = type_of_key;
        buf[14] = 0x80;
        buf[15] = 0x01;
        buf[16] = self.config.algorithm.code();
        buf[17] = self.config.hash.code();
        buf[18] = keyslot;
        buf[19..19 + oid.len()].copy_from_slice(oid);
        buf[19 + oid.len()..].copy_from_slice(diversifier);
        let authkey = BlockAlgo::Aes128(to16(&self.config.authkey));
        let mac = cmac_generic(&authkey, &buf);
        let mut out = [0u8; 16];
        out.copy_from_slice(&mac[..16]);
        out
    }

    fn handle_frame(&mut self, frame: &[u8]) -> Vec<u8> {
        if frame.len() < 3 {
            return Vec::new();
        }
        let pcb = frame[0];
        let offset = usize::from(pcb & 0x08 != 0);
        let cid = if offset > 0 { frame.get(1).copied() } else { None };

        // S-Block DESELECT, with or without CID: echo and end the session.
        if pcb == 0xCA || pcb == 0xC2 {
            self.state = SessionState::Default;
            return self.finish(pcb, cid, vec![0x00], [0x90, 0x00]);
        }

        if frame.len() < 2 + offset + 3 {
            return self.finish(pcb, cid, vec![0x00], [0x6A, 0x82]);
        }
        let apdu_start = 1 + offset;
        let apdu = match Iso7816Apdu::parse(&frame[apdu_start..frame.len() - 2]) {
            Ok(a) => a,
            Err(_) => return self.finish(pcb, cid, vec![0x00], [0x6A, 0x82]),
        };

        let (body, status) = match apdu.ins {
            0xA4 => self.select_file(&apdu),
            0xA5 => self.select_oid(&apdu),
            0x87 => self.mutual_authenticate(&apdu),
            0xCB | 0xDA => self.get_put_data(&apdu),
            _ => (vec![0x00], [0x6A, 0x82]),
        };
        self.finish(pcb, cid, body, status)
    }

    fn finish(&self, pcb: u8, cid: Option<u8>, body: Vec<u8>, status: [u8; 2]) -> Vec<u8> {
        let mut out = vec![pcb];
        if let Some(c) = cid {
            out.push(c);
        }
        out.extend_from_slice(&body);
        out.push(status[0]);
        out.push(status[1]);
        append_crc_a(&out)
    }

    /// `SELECT FILE` (`0xA4`): AID must equal [`SEOS_AID`].
    fn select_file(&self, apdu: &Iso7816Apdu) -> (Vec<u8>, [u8; 2]) {
        if apdu.data == SEOS_AID {
            let inner = tlv::encode(0x84, &apdu.data);
            (tlv::encode(0x6F, &inner), [0x90, 0x00])
        } else {
            (vec![0x00], [0x6A, 0x82])
        }
    }

    /// `SELECT OID` (`0xA5`): walk the request TLV for a `06` tag matching
    /// the configured OID.
    fn select_oid(&mut self, apdu: &Iso7816Apdu) -> (Vec<u8>, [u8; 2]) {
        let matched = tlv::parse_all(&apdu.data)
            .into_iter()
            .any(|n| n.tag == 0x06 && n.value == self.config.oid);
        if !matched {
            return (vec![0x00], [0x6A, 0x82]);
        }

        let bs = self.config.algorithm.block_size();
        let half_bs = bs / 2;

        let mut iv = vec![0u8; bs];
        self.rng.fill(&mut iv[..half_bs]);
        let iv_mac = cmac_generic(&self.privmac_cipher(), &iv[..half_bs]);
        iv[half_bs..].copy_from_slice(&iv_mac[..half_bs]);

        // Always exactly 0x30 bytes: `06 len OID` then `CF len diversifier`,
        // zero-padded to fill the block.
        let reply_len = 0x30usize;
        let mut reply = vec![0u8; reply_len];
        let mut idx = 0;
        reply[idx] = 0x06;
        reply[idx + 1] = self.config.oid.len() as u8;
        reply[idx + 2..idx + 2 + self.config.oid.len()].copy_from_slice(&self.config.oid);
        idx += 2 + self.config.oid.len();
        reply[idx] = 0xCF;
        reply[idx + 1] = self.config.diversifier.len() as u8;
        reply[idx + 2..idx + 2 + self.config.diversifier.len()]
            .copy_from_slice(&self.config.diversifier);

        let cryptogram = self.privenc_cipher().cbc_encrypt(&iv, &reply);

        let mut body = vec![0xCD, 0x02, self.config.algorithm.code(), self.config.hash.code()];
        body.push(0x85);
        body.push((reply_len + bs) as u8);
        body.extend_from_slice(&iv);
        body.extend_from_slice(&cryptogram);

        let cmac = cmac_generic(&self.privmac_cipher(), &body);
        body.push(0x8E);
        body.push(0x08);
        body.extend_from_slice(&cmac[..8]);

        self.state = SessionState::OidSelected;
        (body, [0x90, 0x00])
    }

    /// `MUTUAL AUTHENTICATE` (`0x87`): inner tag `81` requests RND.ICC, `82`
    /// carries the challenge-response cryptogram.
    fn mutual_authenticate(&mut self, apdu: &Iso7816Apdu) -> (Vec<u8>, [u8; 2]) {
        if self.state == SessionState::Default {
            return (vec![0x00], [0x6A, 0x82]);
        }
        let Some(outer) = tlv::find_tag(&apdu.data, 0x7C) else {
            return (vec![0x00], [0x6A, 0x82]);
        };
        let Some(inner) = tlv::parse_all(&outer.value).into_iter().next() else {
            return (vec![0x00], [0x6A, 0x82]);
        };

        match inner.tag {
            0x81 => {
                self.rng.fill(&mut self.rnd_icc);
                let mut reply = vec![0x81, self.rnd_icc.len() as u8];
                reply.extend_from_slice(&self.rnd_icc);
                (tlv::encode(0x7C, &reply), [0x90, 0x00])
            }
            0x82 => self.mutual_authenticate_challenge(apdu, &inner.value),
            _ => (vec![0x00], [0x6A, 0x82]),
        }
    }

    fn mutual_authenticate_challenge(
        &mut self,
        apdu: &Iso7816Apdu,
        received: &[u8],
    ) -> (Vec<u8>, [u8; 2]) {
        if received.len() < 32 + 8 {
            return (vec![0x00], [0x6A, 0x82]);
        }
        let request_len = received.len() - 8;
        let cryptogram = &received[..request_len];
        let received_cmac = &received[request_len..];

        let keyslot = apdu.p2;
        let diver_encr = self
            .config
            .algorithm
            .cipher_from_16(&self.seos_kdf(true, keyslot));
        let diver_cmac_bytes = self.seos_kdf(false, keyslot);
        let diver_cmac = self.config.algorithm.cipher_from_16(&diver_cmac_bytes);

        let cmac = cmac_generic(&diver_cmac, cryptogram);
        if cmac[..8] != received_cmac[..8] {
            return (vec![0x00], [0x6A, 0x82]);
        }

        let zero_iv = vec![0u8; self.config.algorithm.block_size()];
        let request = diver_encr.cbc_decrypt(&zero_iv, cryptogram);
        // request = RND.IFD || RND.ICC' || KEY.IFD
        if request.len() < 32 || request[8..16] != self.rnd_icc {
            return (vec![0x00], [0x6A, 0x82]);
        }
        self.rnd_ifd.copy_from_slice(&request[0..8]);
        self.key_ifd.copy_from_slice(&request[16..32]);

        let mut reply_plain = Vec::with_capacity(32);
        reply_plain.extend_from_slice(&self.rnd_icc);
        reply_plain.extend_from_slice(&self.rnd_ifd);
        reply_plain.extend_from_slice(&self.key_icc);

        let reply_cryptogram = diver_encr.cbc_encrypt(&zero_iv, &reply_plain);
        let reply_cmac = cmac_generic(&diver_cmac, &reply_cryptogram);
        let mut reply = reply_cryptogram;
        reply.extend_from_slice(&reply_cmac[..8]);

        let mut inner = vec![0x82, reply.len() as u8];
        inner.extend_from_slice(&reply);
        let body = tlv::encode(0x7C, &inner);

        self.derive_session_keys();
        self.state = SessionState::Authenticated;
        (body, [0x90, 0x00])
    }

    /// Final session-key derivation, run after a successful challenge
    /// response and before the reply is returned to the reader.
    fn derive_session_keys(&mut self) {
        let mut hash_input = Vec::with_capacity(38);
        hash_input.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        hash_input.extend_from_slice(&self.key_ifd[..8]);
        hash_input.extend_from_slice(&self.key_icc[..8]);
        let alg_code = self.config.algorithm.code();
        hash_input.push(alg_code);
        hash_input.push(alg_code);
        hash_input.extend_from_slice(&self.rnd_icc);
        hash_input.extend_from_slice(&self.rnd_ifd);

        let mut hash_output = vec![0u8; 32];
        match self.config.hash {
            SeosHash::Sha1 => {
                hash_output[..20].copy_from_slice(&sha1(&hash_input));
                hash_input[3] = hash_input[3].wrapping_add(1);
                let second = sha1(&hash_input);
                hash_output.extend_from_slice(&second);
            }
            SeosHash::Sha256 => {
                hash_output.copy_from_slice(&sha256(&hash_input));
            }
        }

        self.session_encr_key = Some(self.config.algorithm.cipher_from_16(&to16(&hash_output[0..16])));
        self.session_cmac_key = Some(self.config.algorithm.cipher_from_16(&to16(&hash_output[16..32])));
    }

    /// `GET DATA` (`0xCB`) / `PUT DATA` (`0xDA`).
    fn get_put_data(&mut self, apdu: &Iso7816Apdu) -> (Vec<u8>, [u8; 2]) {
        let (Some(session_encr), Some(session_cmac)) =
            (self.session_encr_key.clone(), self.session_cmac_key.clone())
        else {
            return (vec![0x00], [0x6A, 0x82]);
        };

        let Some(cryptogram_node) = tlv::find_tag(&apdu.data, 0x85) else {
            return (vec![0x00], [0x6A, 0x82]);
        };
        let Some(cmac_node) = tlv::find_tag(&apdu.data, 0x8E) else {
            return (vec![0x00], [0x6A, 0x82]);
        };
        let cmac_offset = tlv_prefix_before_tag(&apdu.data, 0x8E);

        let bs = self.config.algorithm.block_size();
        let half_bs = bs / 2;
        let mut counter = vec![0u8; bs];
        counter[..half_bs].copy_from_slice(&self.rnd_icc[..half_bs]);
        counter[half_bs..].copy_from_slice(&self.rnd_ifd[..half_bs]);
        increment_counter(&mut counter);

        let mut mac_input = counter.clone();
        let mut header = vec![apdu.cla, apdu.ins, apdu.p1, apdu.p2, 0x80];
        header.resize(bs, 0);
        mac_input.extend_from_slice(&header);
        mac_input.extend_from_slice(&apdu.data[..cmac_offset]);
        pad_80(&mut mac_input, bs);

        let cmac = cmac_generic(&session_cmac, &mac_input);
        if cmac[..cmac_node.value.len().min(cmac.len())] != cmac_node.value[..] {
            return (vec![0x00], [0x6A, 0x82]);
        }

        let zero_iv = vec![0u8; bs];
        let request = session_encr.cbc_decrypt(&zero_iv, &cryptogram_node.value);

        let is_put = apdu.ins == 0xDA;
        let mut body = Vec::new();
        if is_put {
            // PUT DATA is not implemented, matching the original.
            return (vec![0x00], [0x6A, 0x82]);
        }

        if request.is_empty() || request[0] != 0x5C {
            return (vec![0x00], [0x6A, 0x82]);
        }
        let data_tag = &self.config.data_tag;
        if request.len() < 2 + data_tag.len()
            || request[1] as usize != data_tag.len()
            || &request[2..2 + data_tag.len()] != data_tag.as_slice()
        {
            return (vec![0x00], [0x6A, 0x82]);
        }

        let reply_len = round_to_next(data_tag.len() + 1 + self.config.data.len(), bs);
        let mut reply = Vec::with_capacity(reply_len);
        reply.extend_from_slice(data_tag);
        reply.push(self.config.data.len() as u8);
        reply.extend_from_slice(&self.config.data);
        if reply.len() != reply_len {
            reply.push(0x80);
            reply.resize(reply_len, 0);
        }

        let reply_cryptogram = session_encr.cbc_encrypt(&zero_iv, &reply);
        body.push(0x85);
        body.push(reply_len as u8);
        body.extend_from_slice(&reply_cryptogram);

        body.push(0x99);
        body.push(0x02);
        body.push(0x90);
        body.push(0x00);

        increment_counter(&mut counter);
        let mut mac_input2 = counter;
        mac_input2.extend_from_slice(&body);
        pad_80(&mut mac_input2, bs);
        let reply_cmac = cmac_generic(&session_cmac, &mac_input2);
        let cmac_len = cmac_node.value.len();
        body.push(0x8E);
        body.push(cmac_len as u8);
        body.extend_from_slice(&reply_cmac[..cmac_len]);

        (body, [0x90, 0x00])
    }
}

fn to16(key: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    let n = key.len().min(16);
    out[..n].copy_from_slice(&key[..n]);
    out
}

fn round_to_next(value: usize, step: usize) -> usize {
    if value % step == 0 {
        value
    } else {
        value + step - value % step
    }
}

fn pad_80(buf: &mut Vec<u8>, block_size: usize) {
    if buf.len() % block_size != 0 {
        buf.push(0x80);
        while buf.len() % block_size != 0 {
            buf.push(0x00);
        }
    }
}

fn increment_counter(counter: &mut [u8]) {
    for b in counter.iter_mut().rev() {
        *b = b.wrapping_add(1);
        if *b != 0 {
            break;
        }
    }
}

/// Sum of `2 + value.len()` for every top-level TLV node before the first
/// one tagged `target_tag` — the byte offset at which that node's own `T`
/// byte begins.
fn tlv_prefix_before_tag(data: &[u8], target_tag: u8) -> usize {
    let mut pos = 0;
    for node in tlv::parse_all(data) {
        if node.tag == target_tag {
            break;
        }
        pos += 2 + node.value.len();
    }
    pos
}

impl<R: RandomSource> ApplicationHandler for SeosEmulator<R> {
    fn handle_apdu(&mut self, payload: &[u8]) -> Vec<u8> {
        self.handle_frame(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ZeroRandom;
    impl RandomSource for ZeroRandom {
        fn fill(&mut self, buf: &mut [u8]) {
            buf.fill(0);
        }
    }

    fn test_config() -> SeosConfig {
        SeosConfig {
            algorithm: SeosAlgorithm::Aes,
            hash: SeosHash::Sha256,
            uid: vec![0xDE, 0xAD, 0xBE, 0xEF],
            privenc: vec![0x11; 16],
            privmac: vec![0x22; 16],
            authkey: vec![0x33; 16],
            diversifier: vec![0x44; 8],
            data_tag: vec![0xFF, 0x00],
            data: vec![0xAB; 4],
            oid: vec![0x55; 4],
        }
    }

    /// pcb (no CID) + apdu + CRC-A, the wire-level frame `handle_apdu` expects.
    fn make_frame(pcb: u8, apdu: &[u8]) -> Vec<u8> {
        let mut v = vec![pcb];
        v.extend_from_slice(apdu);
        append_crc_a(&v)
    }

    /// Scenario S6: SELECT AID returns the canned FCI TLV.
    #[test]
    fn select_seos_aid_matches_scenario_s6() {
        let mut emu = SeosEmulator::new(test_config(), ZeroRandom);
        let mut apdu = vec![0x00, 0xA4, 0x04, 0x00, SEOS_AID.len() as u8];
        apdu.extend_from_slice(&SEOS_AID);
        let frame = make_frame(0x02, &apdu);

        let resp = emu.handle_apdu(&frame);
        assert_eq!(resp[0], 0x02);
        let body = &resp[1..resp.len() - 4];
        let expected = [
            0x6F, 0x0C, 0x84, 0x0A, 0xA0, 0x00, 0x00, 0x04, 0x40, 0x00, 0x01, 0x01, 0x00, 0x01,
        ];
        assert_eq!(body, expected);
        assert_eq!(&resp[resp.len() - 4..resp.len() - 2], &[0x90, 0x00]);
    }

    #[test]
    fn select_file_with_wrong_aid_is_not_found() {
        let mut emu = SeosEmulator::new(test_config(), ZeroRandom);
        let apdu = vec![0x00, 0xA4, 0x04, 0x00, 0x03, 0x01, 0x02, 0x03];
        let frame = make_frame(0x02, &apdu);
        let resp = emu.handle_apdu(&frame);
        assert_eq!(&resp[resp.len() - 4..resp.len() - 2], &[0x6A, 0x82]);
    }

    #[test]
    fn full_auth_and_get_data_round_trip() {
        let mut emu = SeosEmulator::new(test_config(), ZeroRandom);
        emu.state = SessionState::OidSelected;

        // Reader requests RND.ICC.
        let req_icc = tlv::encode(0x7C, &tlv::encode(0x81, &[]));
        let mut apdu = vec![0x00, 0x87, 0x00, 0x00, req_icc.len() as u8];
        apdu.extend_from_slice(&req_icc);
        let resp = emu.mutual_authenticate(&Iso7816Apdu::parse(&apdu).unwrap());
        assert_eq!(resp.1, [0x90, 0x00]);
        assert_eq!(emu.rnd_icc, [0u8; 8]); // ZeroRandom

        // Build a valid challenge using the per-auth KDF keys directly.
        let keyslot = 0x00;
        let diver_encr = emu
            .config
            .algorithm
            .cipher_from_16(&emu.seos_kdf(true, keyslot));
        let diver_cmac_bytes = emu.seos_kdf(false, keyslot);
        let diver_cmac = emu.config.algorithm.cipher_from_16(&diver_cmac_bytes);

        let rnd_ifd = [0x99u8; 8];
        let key_ifd = [0x77u8; 16];
        let mut plain = Vec::new();
        plain.extend_from_slice(&rnd_ifd);
        plain.extend_from_slice(&emu.rnd_icc);
        plain.extend_from_slice(&key_ifd);
        let zero_iv = vec![0u8; 16];
        let cryptogram = diver_encr.cbc_encrypt(&zero_iv, &plain);
        let cmac = cmac_generic(&diver_cmac, &cryptogram);
        let mut challenge = cryptogram;
        challenge.extend_from_slice(&cmac[..8]);

        let inner = tlv::encode(0x82, &challenge);
        let outer = tlv::encode(0x7C, &inner);
        let mut apdu2 = vec![0x00, 0x87, 0x00, keyslot, outer.len() as u8];
        apdu2.extend_from_slice(&outer);
        let resp2 = emu.mutual_authenticate(&Iso7816Apdu::parse(&apdu2).unwrap());
        assert_eq!(resp2.1, [0x90, 0x00]);
        assert_eq!(emu.state, SessionState::Authenticated);
        assert_eq!(emu.rnd_ifd, rnd_ifd);
        assert_eq!(emu.key_ifd, key_ifd);

        // GET DATA for the configured tag should now succeed.
        let mut request_tlv = vec![0x5C, emu.config.data_tag.len() as u8];
        request_tlv.extend_from_slice(&emu.config.data_tag);
        let bs = 16usize;
        let mut padded = request_tlv.clone();
        pad_80(&mut padded, bs);
        let session_cryptogram = emu
            .session_encr_key
            .clone()
            .unwrap()
            .cbc_encrypt(&zero_iv, &padded);

        let half_bs = bs / 2;
        let mut counter = vec![0u8; bs];
        counter[..half_bs].copy_from_slice(&emu.rnd_icc[..half_bs]);
        counter[half_bs..].copy_from_slice(&emu.rnd_ifd[..half_bs]);
        increment_counter(&mut counter);

        let header = {
            let mut h = vec![0x00, 0xCB, 0x00, 0x00, 0x80];
            h.resize(bs, 0);
            h
        };
        let tlv_body = tlv::encode(0x85, &session_cryptogram);
        let mut mac_input = counter;
        mac_input.extend_from_slice(&header);
        mac_input.extend_from_slice(&tlv_body);
        pad_80(&mut mac_input, bs);
        let request_cmac = cmac_generic(&emu.session_cmac_key.clone().unwrap(), &mac_input);

        let mut data = tlv_body;
        data.extend_from_slice(&tlv::encode(0x8E, &request_cmac[..8]));
        let mut apdu3 = vec![0x00, 0xCB, 0x00, 0x00, data.len() as u8];
        apdu3.extend_from_slice(&data);
        let resp3 = emu.get_put_data(&Iso7816Apdu::parse(&apdu3).unwrap());
        assert_eq!(resp3.1, [0x90, 0x00]);
        assert_eq!(resp3.0[0], 0x85);
    }
}
