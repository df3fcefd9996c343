//! # fbvnc-core
//!
//! Core library for serving a Linux framebuffer over RFB (VNC).
//!
//! This crate contains:
//! - **Screen**: `FrameSource`, `FbDevice`, and the granule `DiffEngine`
//!   that keeps a shadow copy and a 5-5-5 protocol-format frame
//! - **Input**: keysym → PC scancode translation and the `/dev/kbde` sink
//! - **RFB**: handshake, `RfbCodec`, and `RfbServer`, the TCP
//!   `ProtocolAdapter` implementation
//! - **Session**: the Idle/Active capture loop driving all of the above
//! - **Error**: `FbvncError`, a `thiserror`-based error hierarchy

pub mod error;
pub mod input;
pub mod rfb;
pub mod screen;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::FbvncError;
pub use input::{
    ButtonMask, InputDispatcher, InputHandler, KeyDirection, KeySink, KeySym, KeyboardDevice,
    ScancodeSequence,
};
pub use rfb::{PixelFormat, ProtocolAdapter, RfbServer, ServerInit};
pub use screen::{
    BoundsPolicy, DiffEngine, DirtyRect, DirtyRegion, FbDevice, FrameSource, Geometry,
    MemoryFrame,
};
pub use session::{LoopState, Session, SessionConfig};
