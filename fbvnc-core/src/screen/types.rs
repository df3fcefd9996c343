//! Shared types for the capture → diff → protocol pipeline.
//!
//! [`Geometry`] is read once from the device at startup and never
//! changes. [`DirtyRect`] is the clamped rectangle handed to the
//! protocol layer after each pass that found a change.

// ── Channel ──────────────────────────────────────────────────────

/// Where one colour channel's bits sit inside a native pixel word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Channel {
    /// Bit position of the channel's least significant bit.
    pub offset: u32,
    /// Number of bits in the channel.
    pub length: u32,
}

impl Channel {
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Right shift that brings the channel's top 5 bits down to bit 0.
    pub const fn shift_to_5bit(self) -> u32 {
        (self.offset + self.length).saturating_sub(5)
    }
}

// ── Geometry ─────────────────────────────────────────────────────

/// Immutable description of the display device's pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Bits per native pixel word.
    pub bits_per_pixel: u32,
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
}

impl Geometry {
    /// A 16 bpp RGB 5-6-5 geometry, the common layout of phone panels.
    pub const fn rgb565(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits_per_pixel: 16,
            red: Channel::new(11, 5),
            green: Channel::new(5, 6),
            blue: Channel::new(0, 5),
        }
    }

    /// Number of pixels in one full frame.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes occupied by one full frame.
    pub const fn byte_len(&self) -> usize {
        self.pixel_count() * (self.bits_per_pixel as usize / 8)
    }
}

// ── DirtyRect ────────────────────────────────────────────────────

/// A rectangular region whose protocol pixels must be retransmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirtyRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl DirtyRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &DirtyRect) -> DirtyRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        DirtyRect::new(x, y, right - x, bottom - y)
    }

    /// Overlap of `self` and `other`, or `None` if they do not touch.
    pub fn intersect(&self, other: &DirtyRect) -> Option<DirtyRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(DirtyRect::new(x, y, right - x, bottom - y))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb565_shifts() {
        let g = Geometry::rgb565(320, 240);
        assert_eq!(g.red.shift_to_5bit(), 11);
        assert_eq!(g.green.shift_to_5bit(), 6);
        assert_eq!(g.blue.shift_to_5bit(), 0);
        assert_eq!(g.byte_len(), 320 * 240 * 2);
    }

    #[test]
    fn narrow_channel_shift_saturates() {
        assert_eq!(Channel::new(0, 4).shift_to_5bit(), 0);
    }

    #[test]
    fn union_and_intersect() {
        let a = DirtyRect::new(0, 0, 10, 10);
        let b = DirtyRect::new(5, 5, 10, 10);
        assert_eq!(a.union(&b), DirtyRect::new(0, 0, 15, 15));
        assert_eq!(a.intersect(&b), Some(DirtyRect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&DirtyRect::new(10, 0, 4, 4)), None);
    }

    #[test]
    fn union_with_empty_is_identity() {
        let a = DirtyRect::new(3, 4, 5, 6);
        assert_eq!(a.union(&DirtyRect::new(0, 0, 0, 0)), a);
    }
}
