//! Non-fatal diagnostics returned alongside encode results, so the
//! codec stays pure with respect to its declared outputs. The CLI
//! decides how to surface them.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A flushed run shorter than the efficiency threshold. Purely a
    /// compression-quality signal, never an error.
    ShortRun { row: u32, col: u32, length: u16 },
    /// Input raster dimensions differ from the configured session
    /// size; recovered by zero-padding / truncating.
    DimensionMismatch {
        actual_width: u32,
        actual_height: u32,
        width: u32,
        height: u32,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ShortRun { row, col, length } => write!(
                f,
                "run of {} pixels at ({}, {}) is shorter than 5",
                length, col, row
            ),
            Diagnostic::DimensionMismatch {
                actual_width,
                actual_height,
                width,
                height,
            } => write!(
                f,
                "raster is {}x{}, expected {}x{}; padding/truncating",
                actual_width, actual_height, width, height
            ),
        }
    }
}
