//! The seam between the capture loop and a remote-framebuffer protocol.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FbvncError;
use crate::input::handler::InputHandler;
use crate::screen::types::DirtyRect;

/// What the session loop needs from a protocol server.
///
/// The adapter owns client connections. The loop hands it dirty
/// rectangles and lends it the output buffer while it services I/O.
#[async_trait]
pub trait ProtocolAdapter: Send {
    /// Record that `rect` of the output buffer changed.
    fn notify_dirty(&mut self, rect: DirtyRect);

    /// Clients fully connected right now.
    fn client_count(&self) -> usize;

    /// Process network events for at most `timeout`, returning early
    /// once something was handled. Pending updates are sent from
    /// `frame`. Input is delivered to `handler` synchronously.
    ///
    /// Returns the client count after servicing.
    async fn service(
        &mut self,
        timeout: Duration,
        frame: &[u16],
        handler: &mut dyn InputHandler,
    ) -> Result<usize, FbvncError>;
}
