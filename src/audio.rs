//! The per-scanline audio channel: one 8-bit sample per row,
//! multiplexed into the instruction stream, plus WAV export of the
//! decoded track.

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::debug;

/// One sample per scanline at the VGA horizontal line rate.
pub const LINE_RATE_HZ: u32 = 31_469;

/// Supplies the audio sample for each scanline. The sample must be a
/// pure function of the row index so rows stay independently
/// encodable.
pub trait AudioSource: Sync {
    fn sample(&self, row: u32) -> u8;
}

/// Reference source: a deterministic row counter, `(row + 1) mod 256`.
/// Stands in for a real sample feed of the same cardinality.
pub struct RowCounter;

impl AudioSource for RowCounter {
    fn sample(&self, row: u32) -> u8 {
        (row + 1) as u8
    }
}

/// Write the decoded audio track as 8-bit mono WAV.
pub fn write_wav_track(path: &str, samples: &[u8]) -> Result<(), hound::Error> {
    debug!("Writing {} audio samples to {}", samples.len(), path);
    let spec = WavSpec {
        channels: 1,
        sample_rate: LINE_RATE_HZ,
        bits_per_sample: 8,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        // hound takes signed samples; recenter the unsigned channel
        writer.write_sample(sample.wrapping_sub(128) as i8)?;
    }
    writer.finalize()?;
    debug!("Finished writing audio track to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_counter_wraps_at_256() {
        let source = RowCounter;
        assert_eq!(source.sample(0), 1);
        assert_eq!(source.sample(254), 255);
        assert_eq!(source.sample(255), 0);
        assert_eq!(source.sample(256), 1);
    }
}
