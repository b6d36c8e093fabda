//! Positional decoder for the instruction stream.
//!
//! Codeword values are ambiguous on purpose (see `stream`), so a
//! codeword is classified purely by where the decoder stands in the
//! row structure: pixel runs until the row's pixel total reaches the
//! width, then exactly one audio sample, then the next row; after the
//! last row, exactly one stop marker. Decoding is a single forward
//! pass with no buffering beyond the in-progress run, matching the
//! clocked hardware consumer.

use crate::color::dequantize;
use crate::raster::Frame;
use crate::stream::{self, CODEWORD_BYTES};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("run of {length} pixels at row {row}, col {col} overruns the {width}-pixel scanline")]
    MalformedRun {
        row: u32,
        col: u32,
        length: u16,
        width: u32,
    },
    #[error("stream ended before the stop codeword (row {row}, col {col})")]
    TruncatedStream { row: u32, col: u32 },
    #[error("expected the stop codeword 0x000500, found {found:#08x}")]
    TrailingData { found: u32 },
}

/// A fatal decode fault together with the frame/audio prefix
/// reconstructed before the fault, kept for diagnostics.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct DecodeFailure {
    pub error: DecodeError,
    pub frame: Frame,
    pub audio: Vec<u8>,
}

/// Incremental codeword-at-a-time parser. Both the offline
/// whole-stream decode and the clocked serial-link consumer drive this
/// same state machine.
pub struct StreamDecoder {
    width: u32,
    height: u32,
    row: u32,
    col: u32,
    frame: Frame,
    audio: Vec<u8>,
    done: bool,
}

impl StreamDecoder {
    pub fn new(width: u32, height: u32) -> StreamDecoder {
        StreamDecoder {
            width,
            height,
            row: 0,
            col: 0,
            frame: Frame::new(width, height),
            audio: Vec::with_capacity(height as usize),
            done: false,
        }
    }

    /// True once the stop codeword has been consumed.
    pub fn is_complete(&self) -> bool {
        self.done
    }

    /// Feed the next codeword. Classification is by position only.
    pub fn push_codeword(&mut self, word: u32) -> Result<(), DecodeError> {
        if self.done {
            return Err(DecodeError::TrailingData { found: word });
        }
        if self.row == self.height {
            // stop slot
            if word != stream::STOP_CODEWORD {
                return Err(DecodeError::TrailingData { found: word });
            }
            self.done = true;
            return Ok(());
        }
        if self.col < self.width {
            // run slot
            let (length, color) = stream::run_fields(word);
            if length == 0 || self.col + u32::from(length) > self.width {
                return Err(DecodeError::MalformedRun {
                    row: self.row,
                    col: self.col,
                    length,
                    width: self.width,
                });
            }
            let pixel = dequantize(color);
            for col in self.col..self.col + u32::from(length) {
                self.frame.set_pixel(self.row, col, pixel);
            }
            self.col += u32::from(length);
        } else {
            // audio slot; only the low 8 bits are meaningful
            self.audio.push(stream::audio_value(word));
            self.col = 0;
            self.row += 1;
        }
        Ok(())
    }

    pub fn fail(self, error: DecodeError) -> DecodeFailure {
        DecodeFailure {
            error,
            frame: self.frame,
            audio: self.audio,
        }
    }

    /// Finish the parse; a stream that never reached its stop codeword
    /// is truncated.
    pub fn finish(self) -> Result<(Frame, Vec<u8>), DecodeFailure> {
        if self.done {
            Ok((self.frame, self.audio))
        } else {
            let error = DecodeError::TruncatedStream {
                row: self.row,
                col: self.col,
            };
            Err(self.fail(error))
        }
    }

    pub fn position(&self) -> (u32, u32) {
        (self.row, self.col)
    }
}

/// Offline verification decode: whole stream in memory, one forward
/// pass. Returns the reconstructed frame and the per-row audio track.
pub fn decode(bytes: &[u8], width: u32, height: u32) -> Result<(Frame, Vec<u8>), DecodeFailure> {
    debug!(
        "Decoding {} bytes as a {}x{} instruction stream",
        bytes.len(),
        width,
        height
    );
    let mut decoder = StreamDecoder::new(width, height);
    let mut chunks = bytes.chunks_exact(CODEWORD_BYTES);
    for chunk in &mut chunks {
        let word = stream::codeword_from_bytes([chunk[0], chunk[1], chunk[2]]);
        if let Err(error) = decoder.push_codeword(word) {
            return Err(decoder.fail(error));
        }
    }
    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        if decoder.is_complete() {
            // stray bytes after the stop marker
            let found = remainder
                .iter()
                .fold(0u32, |acc, &b| acc << 8 | u32::from(b));
            let error = DecodeError::TrailingData { found };
            return Err(decoder.fail(error));
        }
        // a partial codeword mid-stream is truncation
        let (row, col) = decoder.position();
        let error = DecodeError::TruncatedStream { row, col };
        return Err(decoder.fail(error));
    }
    decoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RowCounter;
    use crate::color::{dequantize, quantize, Pixel, QuantizedColor};
    use crate::raster::Frame;
    use crate::rle;
    use crate::stream::{write_stream, Instruction};
    use indicatif::ProgressBar;

    fn test_frame(width: u32, height: u32) -> Frame {
        let mut frame = Frame::new(width, height);
        for row in 0..height {
            for col in 0..width {
                let v = ((row * 31 + col * 7) % 256) as u8;
                frame.set_pixel(
                    row,
                    col,
                    Pixel::new(v, v.wrapping_add(85), v.wrapping_add(170)),
                );
            }
        }
        frame
    }

    fn encode(frame: &Frame) -> Vec<u8> {
        rle::encode_to_bytes(frame, &RowCounter, &ProgressBar::hidden()).0
    }

    #[test]
    fn round_trip_is_lossy_only_through_quantization() {
        let original = test_frame(64, 16);
        let (decoded, audio) = decode(&encode(&original), 64, 16).unwrap();
        for row in 0..16 {
            for col in 0..64 {
                assert_eq!(
                    decoded.pixel(row, col),
                    dequantize(quantize(original.pixel(row, col)))
                );
            }
        }
        assert_eq!(audio.len(), 16);
    }

    #[test]
    fn audio_track_is_in_row_order() {
        let original = test_frame(8, 300);
        let (_, audio) = decode(&encode(&original), 8, 300).unwrap();
        let expected: Vec<u8> = (0u32..300).map(|row| (row + 1) as u8).collect();
        assert_eq!(audio, expected);
    }

    #[test]
    fn length_1023_run_decodes_as_a_run_not_audio() {
        // ambiguous by value: only position disambiguates
        let color = QuantizedColor(0x42);
        let stream = write_stream(&[
            Instruction::PixelRun { length: 1023, color },
            Instruction::PixelRun { length: 1, color },
            Instruction::AudioSample { value: 9 },
            Instruction::Stop,
        ]);
        let (frame, audio) = decode(&stream, 1024, 1).unwrap();
        assert_eq!(frame.pixel(0, 1023), dequantize(color));
        assert_eq!(audio, vec![9]);
    }

    #[test]
    fn stop_valued_run_decodes_as_a_run_mid_row() {
        // length 5, color 0 collides with the stop codeword
        let stream = write_stream(&[
            Instruction::PixelRun {
                length: 5,
                color: QuantizedColor(0),
            },
            Instruction::PixelRun {
                length: 3,
                color: QuantizedColor(0xFF),
            },
            Instruction::AudioSample { value: 1 },
            Instruction::Stop,
        ]);
        let (frame, _) = decode(&stream, 8, 1).unwrap();
        assert_eq!(frame.pixel(0, 4), Pixel::new(0, 0, 0));
        assert_eq!(frame.pixel(0, 5), Pixel::new(255, 255, 255));
    }

    #[test]
    fn overrunning_run_is_malformed() {
        let stream = write_stream(&[
            Instruction::PixelRun {
                length: 10,
                color: QuantizedColor(1),
            },
            Instruction::AudioSample { value: 1 },
            Instruction::Stop,
        ]);
        let failure = decode(&stream, 8, 1).unwrap_err();
        assert_eq!(
            failure.error,
            DecodeError::MalformedRun {
                row: 0,
                col: 0,
                length: 10,
                width: 8,
            }
        );
    }

    #[test]
    fn missing_stop_is_truncation() {
        let stream = write_stream(&[
            Instruction::PixelRun {
                length: 4,
                color: QuantizedColor(7),
            },
            Instruction::AudioSample { value: 1 },
        ]);
        let failure = decode(&stream, 4, 1).unwrap_err();
        assert_eq!(
            failure.error,
            DecodeError::TruncatedStream { row: 1, col: 0 }
        );
        // the decoded prefix is still returned
        assert_eq!(failure.audio, vec![1]);
        assert_eq!(failure.frame.pixel(0, 3), dequantize(QuantizedColor(7)));
    }

    #[test]
    fn wrong_codeword_in_stop_slot_is_trailing_data() {
        let stream = write_stream(&[
            Instruction::PixelRun {
                length: 4,
                color: QuantizedColor(7),
            },
            Instruction::AudioSample { value: 1 },
            Instruction::AudioSample { value: 2 },
        ]);
        let failure = decode(&stream, 4, 1).unwrap_err();
        assert!(matches!(failure.error, DecodeError::TrailingData { .. }));
    }

    #[test]
    fn bytes_after_stop_are_trailing_data() {
        let frame = test_frame(4, 2);
        let mut stream = encode(&frame);
        stream.extend_from_slice(&[0x00, 0x05, 0x00]);
        let failure = decode(&stream, 4, 2).unwrap_err();
        assert!(matches!(failure.error, DecodeError::TrailingData { .. }));
        // the complete frame decoded before the stray data survives
        assert_eq!(failure.audio.len(), 2);
    }

    #[test]
    fn truncated_mid_codeword_is_truncation() {
        let frame = test_frame(4, 2);
        let mut stream = encode(&frame);
        stream.truncate(stream.len() - 4);
        let failure = decode(&stream, 4, 2).unwrap_err();
        assert!(matches!(failure.error, DecodeError::TruncatedStream { .. }));
    }

    #[test]
    fn zero_length_run_is_malformed() {
        let stream = vec![0x00, 0x00, 0x42];
        let failure = decode(&stream, 4, 1).unwrap_err();
        assert!(matches!(
            failure.error,
            DecodeError::MalformedRun { length: 0, .. }
        ));
    }
}
