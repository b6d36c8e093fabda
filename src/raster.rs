//! Raster input/output boundary: the owned `Frame`, the `RasterSource`
//! contract for external pixel producers, and the dimension fit
//! policies used when a source does not match the session size.

use crate::color::Pixel;
use crate::diag::Diagnostic;
use thiserror::Error;
use tracing::{debug, warn};

pub const VGA_WIDTH: u32 = 640;
pub const VGA_HEIGHT: u32 = 480;

/// External producer of RGB pixels. Immutable once read.
pub trait RasterSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn pixel_at(&self, row: u32, col: u32) -> Pixel;
}

/// How to handle a source whose dimensions differ from the session's
/// configured width/height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitPolicy {
    /// Mismatch is an error.
    Strict,
    /// Mismatch is a warning; missing pixels zero-fill, excess pixels
    /// are dropped.
    PadTruncate,
}

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("raster is {actual_width}x{actual_height}, session expects {width}x{height}")]
    DimensionMismatch {
        actual_width: u32,
        actual_height: u32,
        width: u32,
        height: u32,
    },
    #[error("pixel buffer holds {got} pixels, expected {expected}")]
    PixelCount { got: usize, expected: usize },
    #[error("raster image I/O failed")]
    Image(#[from] image::ImageError),
}

/// An owned raster with fixed dimensions, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Frame {
    /// A black frame of the given size.
    pub fn new(width: u32, height: u32) -> Frame {
        Frame {
            width,
            height,
            pixels: vec![Pixel::new(0, 0, 0); (width * height) as usize],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Pixel>) -> Result<Frame, RasterError> {
        let expected = (width * height) as usize;
        if pixels.len() != expected {
            return Err(RasterError::PixelCount {
                got: pixels.len(),
                expected,
            });
        }
        Ok(Frame {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, row: u32, col: u32) -> Pixel {
        self.pixels[(row * self.width + col) as usize]
    }

    pub fn set_pixel(&mut self, row: u32, col: u32, pixel: Pixel) {
        self.pixels[(row * self.width + col) as usize] = pixel;
    }

    pub fn row(&self, row: u32) -> &[Pixel] {
        let start = (row * self.width) as usize;
        &self.pixels[start..start + self.width as usize]
    }
}

impl RasterSource for Frame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel_at(&self, row: u32, col: u32) -> Pixel {
        self.pixel(row, col)
    }
}

/// Materialize a source into a session-sized `Frame` under the given
/// fit policy. A mismatch under `PadTruncate` is reported as a
/// diagnostic, with out-of-source pixels left black.
pub fn conform<S: RasterSource>(
    source: &S,
    width: u32,
    height: u32,
    policy: FitPolicy,
) -> Result<(Frame, Vec<Diagnostic>), RasterError> {
    let mut diagnostics = Vec::new();
    if source.width() != width || source.height() != height {
        match policy {
            FitPolicy::Strict => {
                return Err(RasterError::DimensionMismatch {
                    actual_width: source.width(),
                    actual_height: source.height(),
                    width,
                    height,
                })
            }
            FitPolicy::PadTruncate => {
                warn!(
                    "raster is {}x{}, expected {}x{}; padding/truncating",
                    source.width(),
                    source.height(),
                    width,
                    height
                );
                diagnostics.push(Diagnostic::DimensionMismatch {
                    actual_width: source.width(),
                    actual_height: source.height(),
                    width,
                    height,
                });
            }
        }
    }

    let mut frame = Frame::new(width, height);
    let copy_rows = height.min(source.height());
    let copy_cols = width.min(source.width());
    for row in 0..copy_rows {
        for col in 0..copy_cols {
            frame.set_pixel(row, col, source.pixel_at(row, col));
        }
    }
    Ok((frame, diagnostics))
}

/// Load a raster image file (PNG, BMP, ...) as a `Frame`, dropping any
/// alpha channel.
pub fn load_image(path: &str) -> Result<Frame, RasterError> {
    debug!("Reading raster image from {}", path);
    let img = image::open(path)?.to_rgb8();
    let (width, height) = img.dimensions();
    let pixels = img.pixels().map(|p| Pixel(p.0)).collect();
    debug!("Read {}x{} raster", width, height);
    Frame::from_pixels(width, height, pixels)
}

pub fn save_png(frame: &Frame, path: &str) -> Result<(), RasterError> {
    debug!("Writing {}x{} raster to {}", frame.width, frame.height, path);
    let mut raw = Vec::with_capacity(frame.pixels.len() * 3);
    for pixel in &frame.pixels {
        raw.extend_from_slice(&pixel.0);
    }
    image::save_buffer(
        path,
        &raw,
        frame.width,
        frame.height,
        image::ColorType::Rgb8,
    )?;
    debug!("Finished writing raster to {}", path);
    Ok(())
}
