//! # Remote framebuffer protocol
//!
//! | Module      | Purpose                                             |
//! |-------------|-----------------------------------------------------|
//! | `protocol`  | Wire types: versions, pixel format, messages        |
//! | `handshake` | Version, security and init exchange                 |
//! | `codec`     | `tokio_util` codec for post-handshake traffic       |
//! | `adapter`   | `ProtocolAdapter`, the seam the session loop drives |
//! | `server`    | `RfbServer`, the TCP implementation of the adapter  |

pub mod adapter;
pub mod codec;
pub mod handshake;
pub mod protocol;
pub mod server;

pub use adapter::ProtocolAdapter;
pub use codec::RfbCodec;
pub use handshake::handshake;
pub use protocol::{
    ClientMessage, FramebufferUpdate, PixelFormat, ProtocolVersion, RawRect, ServerInit,
};
pub use server::{ClientId, RfbServer};
