//! Scanline run-length encoding and audio injection.
//!
//! Runs are greedy and strictly per-scanline: state resets at the
//! start of every row (the horizontal-sync boundary the playback
//! engine must respect), and a run that would exceed the 10-bit length
//! field is split into consecutive runs of the same color. After each
//! row's runs comes that row's audio sample; the whole stream ends
//! with a single stop marker.

use crate::audio::AudioSource;
use crate::color::{quantize, Pixel, QuantizedColor};
use crate::diag::Diagnostic;
use crate::raster::Frame;
use crate::stream::{self, Instruction, MAX_RUN};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use tracing::debug;

/// Runs shorter than this are flagged as a compression-efficiency
/// diagnostic. Never an error.
pub const SHORT_RUN_THRESHOLD: u16 = 5;

fn flush_run(
    color: QuantizedColor,
    length: u16,
    row: u32,
    start_col: u32,
    instructions: &mut Vec<Instruction>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if length < SHORT_RUN_THRESHOLD {
        diagnostics.push(Diagnostic::ShortRun {
            row,
            col: start_col,
            length,
        });
    }
    instructions.push(Instruction::PixelRun { length, color });
}

/// Encode one scanline. The emitted run lengths always sum to the
/// slice length; even a trailing length-1 run is flushed.
pub fn encode_row(pixels: &[Pixel], row: u32) -> (Vec<Instruction>, Vec<Diagnostic>) {
    let mut instructions = Vec::new();
    let mut diagnostics = Vec::new();
    let mut current: Option<QuantizedColor> = None;
    let mut length: u16 = 0;
    let mut start_col: u32 = 0;

    for (col, &pixel) in pixels.iter().enumerate() {
        let color = quantize(pixel);
        match current {
            Some(open) if open == color && length < MAX_RUN => length += 1,
            Some(open) => {
                flush_run(open, length, row, start_col, &mut instructions, &mut diagnostics);
                current = Some(color);
                length = 1;
                start_col = col as u32;
            }
            None => {
                current = Some(color);
                length = 1;
                start_col = col as u32;
            }
        }
    }
    if let Some(open) = current {
        flush_run(open, length, row, start_col, &mut instructions, &mut diagnostics);
    }
    (instructions, diagnostics)
}

/// Encode a whole frame into the instruction stream: per-row pixel
/// runs, one audio sample per row, one trailing stop. Rows are
/// independent by construction and encoded in parallel; outputs are
/// concatenated in row order.
pub fn encode_frame<A: AudioSource>(
    frame: &Frame,
    audio: &A,
    progress: &ProgressBar,
) -> (Vec<Instruction>, Vec<Diagnostic>) {
    debug!(
        "Encoding {}x{} frame into RLE instructions",
        frame.width(),
        frame.height()
    );

    let rows: Vec<(Vec<Instruction>, Vec<Diagnostic>)> = (0..frame.height())
        .into_par_iter()
        .progress_with(progress.clone())
        .map(|row| {
            let (mut instructions, diagnostics) = encode_row(frame.row(row), row);
            instructions.push(Instruction::AudioSample {
                value: audio.sample(row),
            });
            (instructions, diagnostics)
        })
        .collect();

    let mut instructions = Vec::new();
    let mut diagnostics = Vec::new();
    for (row_instructions, row_diagnostics) in rows {
        instructions.extend(row_instructions);
        diagnostics.extend(row_diagnostics);
    }
    instructions.push(Instruction::Stop);

    debug!(
        "Encoded {} instructions ({} diagnostics)",
        instructions.len(),
        diagnostics.len()
    );
    (instructions, diagnostics)
}

/// `encode_frame` serialized to wire bytes.
pub fn encode_to_bytes<A: AudioSource>(
    frame: &Frame,
    audio: &A,
    progress: &ProgressBar,
) -> (Vec<u8>, Vec<Diagnostic>) {
    let (instructions, diagnostics) = encode_frame(frame, audio, progress);
    (stream::write_stream(&instructions), diagnostics)
}
