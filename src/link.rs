//! Clocked serial-link consumer model.
//!
//! The playback engine accepts one 4-bit nibble per clock edge, and
//! only on edges where it asserts its ready/clock-enable signal. The
//! transactor polls `clock()` once per edge and delivers exactly one
//! nibble per ready assertion, high nibble first, in stream order.
//! Waiting for ready is bounded by a per-nibble cycle budget; running
//! out of budget is a fatal timeout fault, never a silent stall.

use crate::decode::{DecodeError, DecodeFailure, StreamDecoder};
use crate::raster::Frame;
use crate::stream;
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub struct LinkConfig {
    /// Maximum clock edges to wait for ready before giving up on one
    /// nibble.
    pub cycle_budget: u32,
    /// The simulated consumer asserts ready once every this many
    /// edges.
    pub ready_interval: u32,
}

impl Default for LinkConfig {
    fn default() -> LinkConfig {
        LinkConfig {
            cycle_budget: 64,
            ready_interval: 4,
        }
    }
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("link timeout: ready not asserted within {budget} cycles for nibble {index}")]
    Timeout { budget: u32, index: usize },
    #[error(transparent)]
    Decode(#[from] DecodeFailure),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkReport {
    pub nibbles: usize,
    pub cycles: u64,
}

/// The consumer side of the link: a clocked state machine that
/// reassembles nibbles into 3-byte codewords and feeds the shared
/// positional decoder. It has no frame buffer beyond the in-progress
/// codeword.
pub struct SerialLinkSimulator {
    decoder: StreamDecoder,
    ready_interval: u32,
    cycle: u64,
    pending_nibble: Option<u8>,
    word: [u8; 3],
    filled: usize,
}

impl SerialLinkSimulator {
    pub fn new(width: u32, height: u32, ready_interval: u32) -> SerialLinkSimulator {
        SerialLinkSimulator {
            decoder: StreamDecoder::new(width, height),
            ready_interval: ready_interval.max(1),
            cycle: 0,
            pending_nibble: None,
            word: [0; 3],
            filled: 0,
        }
    }

    /// Advance one clock edge. Returns the ready signal sampled on
    /// this edge; a nibble may be delivered only when it is true.
    pub fn clock(&mut self) -> bool {
        self.cycle += 1;
        self.cycle % u64::from(self.ready_interval) == 0
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Deliver one nibble on a ready edge. High nibble of each byte
    /// first.
    pub fn deliver(&mut self, nibble: u8) -> Result<(), DecodeError> {
        debug_assert!(nibble <= 0xF);
        match self.pending_nibble.take() {
            None => {
                self.pending_nibble = Some(nibble);
                Ok(())
            }
            Some(high) => {
                self.word[self.filled] = high << 4 | nibble;
                self.filled += 1;
                if self.filled == stream::CODEWORD_BYTES {
                    self.filled = 0;
                    let word = stream::codeword_from_bytes(self.word);
                    self.decoder.push_codeword(word)
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn into_failure(self, error: DecodeError) -> DecodeFailure {
        self.decoder.fail(error)
    }

    pub fn into_decoder(self) -> StreamDecoder {
        self.decoder
    }
}

/// Real-time streaming decode: pump the whole instruction stream
/// through the clocked handshake into the positional decoder.
pub fn stream_decode(
    bytes: &[u8],
    width: u32,
    height: u32,
    config: LinkConfig,
) -> Result<(Frame, Vec<u8>, LinkReport), LinkError> {
    debug!(
        "Streaming {} bytes over the serial link (budget {} cycles/nibble)",
        bytes.len(),
        config.cycle_budget
    );
    let mut link = SerialLinkSimulator::new(width, height, config.ready_interval);
    let mut nibbles = 0usize;

    for (index, nibble) in bytes.iter().flat_map(|&b| [b >> 4, b & 0x0F]).enumerate() {
        let mut delivered = false;
        for _ in 0..config.cycle_budget {
            if link.clock() {
                if let Err(error) = link.deliver(nibble) {
                    return Err(LinkError::Decode(link.into_failure(error)));
                }
                delivered = true;
                break;
            }
        }
        if !delivered {
            return Err(LinkError::Timeout {
                budget: config.cycle_budget,
                index,
            });
        }
        nibbles += 1;
    }

    let cycles = link.cycles();
    let (frame, audio) = link.into_decoder().finish()?;
    debug!("Streamed {} nibbles in {} cycles", nibbles, cycles);
    Ok((frame, audio, LinkReport { nibbles, cycles }))
}
