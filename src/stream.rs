//! Instruction codewords and stream framing.
//!
//! Every instruction is one 24-bit big-endian codeword:
//!
//! | instruction              | 24-bit value                   |
//! |--------------------------|--------------------------------|
//! | `PixelRun{length,color}` | `(length & 0x3FF) << 8 | color`|
//! | `AudioSample{value}`     | `0x3FF00 + value`              |
//! | `Stop`                   | `0x000500`                     |
//!
//! The encodings collide on purpose-built hardware grounds: a run of
//! length 1023 occupies the same value range as an audio sample, and a
//! run of length 5 with color 0 equals the stop marker. Codewords are
//! therefore never classified by value; the decoder classifies by its
//! position within the row structure (see `decode`).

use crate::color::QuantizedColor;

pub const CODEWORD_BYTES: usize = 3;
pub const MAX_RUN: u16 = 1023;
pub const AUDIO_BASE: u32 = 0x3FF00;
pub const STOP_CODEWORD: u32 = 0x000500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// A horizontal run of identical quantized pixels, 1..=1023 long,
    /// never crossing a scanline boundary.
    PixelRun { length: u16, color: QuantizedColor },
    /// One 8-bit audio sample, emitted once per scanline.
    AudioSample { value: u8 },
    /// End of stream, emitted exactly once.
    Stop,
}

impl Instruction {
    pub fn codeword(self) -> u32 {
        match self {
            Instruction::PixelRun { length, color } => {
                (u32::from(length) & 0x3FF) << 8 | u32::from(color.0)
            }
            Instruction::AudioSample { value } => AUDIO_BASE + u32::from(value),
            Instruction::Stop => STOP_CODEWORD,
        }
    }

    pub fn to_bytes(self) -> [u8; CODEWORD_BYTES] {
        let word = self.codeword();
        [(word >> 16) as u8, (word >> 8) as u8, word as u8]
    }
}

/// Reassemble one codeword from its 3 big-endian wire bytes.
pub fn codeword_from_bytes(bytes: [u8; CODEWORD_BYTES]) -> u32 {
    u32::from(bytes[0]) << 16 | u32::from(bytes[1]) << 8 | u32::from(bytes[2])
}

/// Field extraction for a codeword sitting in a pixel-run slot.
pub fn run_fields(word: u32) -> (u16, QuantizedColor) {
    (((word >> 8) & 0x3FF) as u16, QuantizedColor((word & 0xFF) as u8))
}

/// Field extraction for a codeword sitting in an audio slot. Only the
/// low 8 bits carry the sample.
pub fn audio_value(word: u32) -> u8 {
    (word & 0xFF) as u8
}

pub fn write_stream(instructions: &[Instruction]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(instructions.len() * CODEWORD_BYTES);
    for instruction in instructions {
        bytes.extend_from_slice(&instruction.to_bytes());
    }
    bytes
}
