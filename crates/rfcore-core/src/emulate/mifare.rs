//! Generic MIFARE-compatible card-emulation substrate.
//!
//! Grounded in `spec.md` §2 ("Tag-emulation state machines (≈20%) — MIFARE
//! Classic/Ultralight emulation substrate plus two higher-level emulators")
//! and `armsrc/emvsim.c`/`seos.c`, both of which
//! build directly on `MifareSimInit`/`mifaresim.c`'s select/anti-collision
//! handling and only diverge at the application layer (the I-Block payload
//! dispatch). This module is that shared layer: it owns the
//! [`crate::protocol::iso14443a::Iso14443aStateMachine`] select/RATS/HALT
//! handling and forwards I-Block payloads to an [`ApplicationHandler`],
//! which is where `emv::EmvBridge` and `seos::SeosEmulator` each plug in
//! their own APDU dispatch.

use crate::protocol::iso14443a::{CardIdentity, Iso14443aStateMachine, ReaderCommand, TagResponse};

/// An application-layer handler that consumes one I-Block payload (the raw
/// APDU bytes, CRC included, as carried over the air) and produces the
/// response payload to wrap back into an I-Block.
pub trait ApplicationHandler {
    fn handle_apdu(&mut self, payload: &[u8]) -> Vec<u8>;
}

/// Couples the generic 14443-A select/RATS/HALT state machine with an
/// application handler that only ever sees I-Block payloads.
pub struct CardEmulator<H: ApplicationHandler> {
    pub protocol: Iso14443aStateMachine,
    pub handler: H,
}

impl<H: ApplicationHandler> CardEmulator<H> {
    #[must_use]
    pub fn new(card: CardIdentity, handler: H) -> Self {
        Self {
            protocol: Iso14443aStateMachine::new(card),
            handler,
        }
    }

    /// Feed one reader command. I-Blocks are routed through the application
    /// handler (with the protocol layer still tracking the block-number
    /// toggle); everything else (select cascade, RATS, HALT, R-Blocks,
    /// S(DESELECT)) is handled purely by the 14443-A layer.
    pub fn handle(&mut self, cmd: &ReaderCommand) -> TagResponse {
        if let ReaderCommand::IBlock { payload, .. } = cmd {
            let response_payload = self.handler.handle_apdu(payload);
            match self.protocol.handle(cmd) {
                TagResponse::IBlock { block_number, .. } => TagResponse::IBlock {
                    block_number,
                    payload: response_payload,
                },
                other => other,
            }
        } else {
            self.protocol.handle(cmd)
        }
    }
}
