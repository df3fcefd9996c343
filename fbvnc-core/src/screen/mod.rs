//! # Screen pipeline
//!
//! ```text
//! FrameSource (FbDevice / MemoryFrame)
//!     ↓  live &[u16]
//! DiffEngine ── shadow (native) ── output (RFB 5-5-5)
//!     ↓  DirtyRegion → DirtyRect
//! ProtocolAdapter::notify_dirty
//! ```
//!
//! | Module    | Purpose                                          |
//! |-----------|--------------------------------------------------|
//! | `types`   | Geometry, channel descriptors, dirty rectangles  |
//! | `convert` | Native 16 bpp → RFB 5-5-5 conversion             |
//! | `delta`   | Granule diff pass and dirty-region accumulation  |
//! | `capture` | Frame sources: Linux framebuffer and in-memory   |

pub mod capture;
pub mod convert;
pub mod delta;
pub mod types;

pub use capture::{DEFAULT_FB_DEVICE, FbDevice, FrameSource, MemoryFrame};
pub use convert::PixelConverter;
pub use delta::{BoundsPolicy, DiffEngine, DirtyRegion, GRANULE_PIXELS};
pub use types::{Channel, DirtyRect, Geometry};
