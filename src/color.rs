//! 24-bit RGB <-> 8-bit RRRGGGBB color conversion.
//!
//! The hardware palette is 8 bits per pixel: 3 bits red, 3 bits green,
//! 2 bits blue. Quantization keeps the top bits of each channel
//! (truncating shift, matching the fixed-point bit select in the RTL);
//! dequantization replicates the high bits into the low bits so each
//! bucket maps back to its brightest achievable 8-bit value.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pixel(pub [u8; 3]);

impl Pixel {
    pub fn new(r: u8, g: u8, b: u8) -> Pixel {
        Pixel([r, g, b])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }
}

/// One packed RRRGGGBB palette entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QuantizedColor(pub u8);

pub fn quantize(pixel: Pixel) -> QuantizedColor {
    let r3 = pixel.r() >> 5;
    let g3 = pixel.g() >> 5;
    let b2 = pixel.b() >> 6;
    QuantizedColor((r3 << 5) | (g3 << 2) | b2)
}

pub fn dequantize(color: QuantizedColor) -> Pixel {
    let r3 = (color.0 >> 5) & 0x07;
    let g3 = (color.0 >> 2) & 0x07;
    let b2 = color.0 & 0x03;
    Pixel::new(
        (r3 << 5) | (r3 << 2) | (r3 >> 1),
        (g3 << 5) | (g3 << 2) | (g3 >> 1),
        (b2 << 6) | (b2 << 4) | (b2 << 2) | b2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_keeps_top_bits() {
        assert_eq!(quantize(Pixel::new(0, 0, 0)), QuantizedColor(0x00));
        assert_eq!(quantize(Pixel::new(255, 255, 255)), QuantizedColor(0xFF));
        // 0xE0 red, mid green, low blue
        assert_eq!(quantize(Pixel::new(0xFF, 0x80, 0x3F)), QuantizedColor(0b111_100_00));
        // channel boundaries: 31 is still bucket 0 for red/green, 63 for blue
        assert_eq!(quantize(Pixel::new(31, 31, 63)), QuantizedColor(0x00));
        assert_eq!(quantize(Pixel::new(32, 32, 64)), QuantizedColor(0b001_001_01));
    }

    #[test]
    fn dequantize_replicates_bits() {
        // full-scale fields come back as 255
        assert_eq!(dequantize(QuantizedColor(0xFF)), Pixel::new(255, 255, 255));
        assert_eq!(dequantize(QuantizedColor(0x00)), Pixel::new(0, 0, 0));
        // red = 0b100 -> 1001_0010
        assert_eq!(dequantize(QuantizedColor(0b100_000_00)).r(), 0b1001_0010);
        // blue = 0b01 -> 0101_0101
        assert_eq!(dequantize(QuantizedColor(0b000_000_01)).b(), 0b0101_0101);
    }

    #[test]
    fn dequantize_is_right_inverse() {
        // every palette entry survives a quantize round trip exactly
        for code in 0u8..=255 {
            let color = QuantizedColor(code);
            assert_eq!(quantize(dequantize(color)), color);
        }
    }

    #[test]
    fn quantize_is_idempotent_through_dequantize() {
        for r in (0u16..256).step_by(17) {
            for g in (0u16..256).step_by(17) {
                for b in (0u16..256).step_by(17) {
                    let p = Pixel::new(r as u8, g as u8, b as u8);
                    let q = quantize(p);
                    assert_eq!(quantize(dequantize(q)), q);
                }
            }
        }
    }
}
