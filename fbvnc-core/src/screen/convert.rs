//! Native 16 bpp → RFB 5-5-5 pixel conversion.
//!
//! The protocol-side layout keeps red in bits 0–4, green in 5–9 and
//! blue in 10–14. Each native channel contributes its top five bits.

use crate::screen::types::Geometry;

const FIVE_BITS: u16 = 0x1f;

/// Precomputed per-channel shifts for one device geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelConverter {
    red_shift: u32,
    green_shift: u32,
    blue_shift: u32,
}

impl PixelConverter {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            red_shift: geometry.red.shift_to_5bit(),
            green_shift: geometry.green.shift_to_5bit(),
            blue_shift: geometry.blue.shift_to_5bit(),
        }
    }

    /// Convert one native pixel word.
    #[inline]
    pub fn convert(&self, pixel: u16) -> u16 {
        ((pixel >> self.red_shift) & FIVE_BITS)
            | (((pixel >> self.green_shift) & FIVE_BITS) << 5)
            | (((pixel >> self.blue_shift) & FIVE_BITS) << 10)
    }

    /// Convert a granule of up to two adjacent pixels into `out`.
    #[inline]
    pub fn convert_granule(&self, src: &[u16], out: &mut [u16]) {
        for (dst, &p) in out.iter_mut().zip(src) {
            *dst = self.convert(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb565() -> PixelConverter {
        PixelConverter::new(&Geometry::rgb565(2, 1))
    }

    #[test]
    fn primaries_land_in_their_slots() {
        let c = rgb565();
        assert_eq!(c.convert(0xF800), 0x001F); // red
        assert_eq!(c.convert(0x07E0), 0x03E0); // green
        assert_eq!(c.convert(0x001F), 0x7C00); // blue
        assert_eq!(c.convert(0xFFFF), 0x7FFF);
        assert_eq!(c.convert(0x0000), 0x0000);
    }

    #[test]
    fn mixed_pixel_bits() {
        // r = 0b10110, g = 0b101011, b = 0b01101
        let native: u16 = (0b10110 << 11) | (0b101011 << 5) | 0b01101;
        // Green keeps its top five bits: 0b10101.
        let expected: u16 = 0b10110 | (0b10101 << 5) | (0b01101 << 10);
        assert_eq!(rgb565().convert(native), expected);
    }

    #[test]
    fn granule_converts_both_halves() {
        let c = rgb565();
        let mut out = [0u16; 2];
        c.convert_granule(&[0xF800, 0x001F], &mut out);
        assert_eq!(out, [0x001F, 0x7C00]);
    }

    #[test]
    fn single_pixel_granule() {
        let c = rgb565();
        let mut out = [0u16; 1];
        c.convert_granule(&[0x07E0], &mut out);
        assert_eq!(out, [0x03E0]);
    }
}
