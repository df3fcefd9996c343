//! Granule-level change detection between consecutive frames.
//!
//! [`DiffEngine`] keeps a shadow copy of the last observed device
//! frame and a protocol-format copy of the whole screen. Each pass
//! walks the live buffer two pixels at a time, rewrites only the
//! granules that changed, and reports one bounding [`DirtyRegion`].

use std::str::FromStr;

use crate::error::FbvncError;
use crate::screen::convert::PixelConverter;
use crate::screen::types::{DirtyRect, Geometry};

/// Pixels compared and rewritten together.
pub const GRANULE_PIXELS: usize = 2;

const EMPTY_MIN: i32 = i32::MAX;
const EMPTY_MAX: i32 = -1;

// ── BoundsPolicy ─────────────────────────────────────────────────

/// How changed granules grow the [`DirtyRegion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsPolicy {
    /// The first hit fixes the left edge; later hits only widen to
    /// the right and grow vertically.
    #[default]
    Legacy,
    /// Plain min/max over every hit.
    Symmetric,
}

impl FromStr for BoundsPolicy {
    type Err = FbvncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(BoundsPolicy::Legacy),
            "symmetric" => Ok(BoundsPolicy::Symmetric),
            other => Err(FbvncError::Other(format!("unknown bounds policy: {other}"))),
        }
    }
}

// ── DirtyRegion ──────────────────────────────────────────────────

/// Bounding box of the granules changed in one pass.
///
/// Coordinates are granule origins: `min_x`/`max_x` are even columns
/// (the right edge of the box is `max_x + 2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Default for DirtyRegion {
    fn default() -> Self {
        Self::empty()
    }
}

impl DirtyRegion {
    /// The sentinel state: mins above any coordinate, maxes below zero.
    pub const fn empty() -> Self {
        Self {
            min_x: EMPTY_MIN,
            min_y: EMPTY_MIN,
            max_x: EMPTY_MAX,
            max_y: EMPTY_MAX,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.min_x == EMPTY_MIN
    }

    /// Fold one changed granule at `(x, y)` into the region.
    pub fn record(&mut self, x: i32, y: i32, policy: BoundsPolicy) {
        match policy {
            BoundsPolicy::Legacy => {
                if self.is_empty() {
                    self.min_x = x;
                    self.min_y = y;
                    return;
                }
                self.max_x = self.max_x.max(x);
            }
            BoundsPolicy::Symmetric => {
                self.min_x = self.min_x.min(x);
                self.max_x = self.max_x.max(x);
            }
        }
        self.max_y = self.max_y.max(y);
        self.min_y = self.min_y.min(y);
    }

    /// Apply the end-of-pass defaults: unraised maxes take the mins.
    pub fn finish(&mut self) {
        if self.is_empty() {
            return;
        }
        if self.max_x < 0 {
            self.max_x = self.min_x;
        }
        if self.max_y < 0 {
            self.max_y = self.min_y;
        }
        // Legacy: a later hit left of the first one leaves max_x short.
        self.max_x = self.max_x.max(self.min_x);
        self.max_y = self.max_y.max(self.min_y);
    }

    /// Width sent downstream: the granule at `max_x` spans two columns.
    pub const fn width(&self) -> i32 {
        (self.max_x + GRANULE_PIXELS as i32) - self.min_x
    }

    pub const fn height(&self) -> i32 {
        (self.max_y + 1) - self.min_y
    }

    /// Convert to a rectangle clamped to `geometry`, or `None` when empty.
    pub fn to_rect(&self, geometry: &Geometry) -> Option<DirtyRect> {
        if self.is_empty() {
            return None;
        }
        let x = self.min_x.max(0) as u32;
        let y = self.min_y.max(0) as u32;
        let right = ((self.max_x + GRANULE_PIXELS as i32).max(0) as u32).min(geometry.width);
        let bottom = ((self.max_y + 1).max(0) as u32).min(geometry.height);
        if right <= x || bottom <= y {
            return None;
        }
        Some(DirtyRect::new(x, y, right - x, bottom - y))
    }

    /// Whether the pixel at `(x, y)` lies inside the region's box.
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        !self.is_empty()
            && self.min_x <= x
            && x <= self.max_x + 1
            && self.min_y <= y
            && y <= self.max_y
    }
}

// ── DiffEngine ───────────────────────────────────────────────────

/// Stateful detector owning the shadow and protocol-format buffers.
pub struct DiffEngine {
    geometry: Geometry,
    converter: PixelConverter,
    policy: BoundsPolicy,
    /// Last observed device content, native format.
    shadow: Vec<u16>,
    /// Full frame in protocol format.
    output: Vec<u16>,
}

impl DiffEngine {
    /// Create an engine for a 16 bpp geometry with zeroed buffers.
    pub fn new(geometry: Geometry) -> Result<Self, FbvncError> {
        Self::with_policy(geometry, BoundsPolicy::default())
    }

    pub fn with_policy(geometry: Geometry, policy: BoundsPolicy) -> Result<Self, FbvncError> {
        if geometry.bits_per_pixel != 16 {
            return Err(FbvncError::UnsupportedDepth(geometry.bits_per_pixel));
        }
        let pixels = geometry.pixel_count();
        Ok(Self {
            geometry,
            converter: PixelConverter::new(&geometry),
            policy,
            shadow: vec![0; pixels],
            output: vec![0; pixels],
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn policy(&self) -> BoundsPolicy {
        self.policy
    }

    /// The protocol-format frame the adapter transmits from.
    pub fn output(&self) -> &[u16] {
        &self.output
    }

    /// The native-format copy of the last observed frame.
    pub fn shadow(&self) -> &[u16] {
        &self.shadow
    }

    /// Forget the last observed frame so the next pass rewrites
    /// every non-black granule.
    pub fn invalidate(&mut self) {
        self.shadow.fill(0);
    }

    /// Compare `live` against the shadow, convert changed granules
    /// into the output buffer and return the pass's bounding region.
    ///
    /// `live` must hold exactly `width × height` pixels.
    pub fn compare_and_encode(&mut self, live: &[u16]) -> Result<DirtyRegion, FbvncError> {
        if live.len() != self.shadow.len() {
            return Err(FbvncError::BufferLength {
                expected: self.shadow.len(),
                actual: live.len(),
            });
        }

        let width = self.geometry.width as usize;
        let mut region = DirtyRegion::empty();
        if width == 0 {
            return Ok(region);
        }

        let rows = live
            .chunks_exact(width)
            .zip(self.shadow.chunks_exact_mut(width))
            .zip(self.output.chunks_exact_mut(width));

        for (y, ((live_row, shadow_row), out_row)) in rows.enumerate() {
            let granules = live_row
                .chunks(GRANULE_PIXELS)
                .zip(shadow_row.chunks_mut(GRANULE_PIXELS))
                .zip(out_row.chunks_mut(GRANULE_PIXELS));

            for (g, ((cur, prev), out)) in granules.enumerate() {
                if *cur == *prev {
                    continue;
                }
                prev.copy_from_slice(cur);
                self.converter.convert_granule(cur, out);
                region.record((g * GRANULE_PIXELS) as i32, y as i32, self.policy);
            }
        }

        region.finish();
        Ok(region)
    }
}

// ── Tests ────────────────────────────────────────────────────────
