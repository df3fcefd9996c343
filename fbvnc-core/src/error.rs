//! Domain-specific error types for fbvnc.
//!
//! All fallible operations return `Result<T, FbvncError>`.
//! Startup variants are fatal to the caller; the runtime variants are
//! logged and the affected event or client is dropped.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The canonical error type for fbvnc.
#[derive(Debug, Error)]
pub enum FbvncError {
    // ── Device Errors ────────────────────────────────────────────
    /// A device node could not be opened.
    #[error("cannot open {path}: {source}")]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The framebuffer geometry ioctl failed.
    #[error("framebuffer geometry query failed: {0}")]
    GeometryQuery(#[source] std::io::Error),

    /// Mapping the framebuffer memory failed.
    #[error("framebuffer mapping failed: {0}")]
    Mmap(#[source] std::io::Error),

    /// Only 16 bits-per-pixel framebuffers are handled.
    #[error("unsupported pixel depth: {0} bpp (only 16 is supported)")]
    UnsupportedDepth(u32),

    /// A pixel buffer does not match the geometry it is paired with.
    #[error("buffer length mismatch: expected {expected} pixels, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    /// Creating a missing device node failed.
    #[error("cannot create device node {path}: {source}")]
    NodeCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input device accepted fewer bytes than were written.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    // ── Protocol Errors ──────────────────────────────────────────
    /// The peer offered a protocol version we cannot speak.
    #[error("unsupported protocol version: {0:?}")]
    UnsupportedVersion(String),

    /// A message violated protocol rules.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    /// A message type byte did not map to any known message.
    #[error("unknown client message type: {0}")]
    UnknownMessage(u8),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for FbvncError {
    fn from(s: String) -> Self {
        FbvncError::Other(s)
    }
}

impl From<&str> for FbvncError {
    fn from(s: &str) -> Self {
        FbvncError::Other(s.to_string())
    }
}
