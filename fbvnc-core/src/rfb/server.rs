//! TCP RFB server implementing [`ProtocolAdapter`].
//!
//! Network I/O runs in background tasks; all client state lives in
//! [`RfbServer`] and is only touched from [`ProtocolAdapter::service`],
//! so input callbacks and update encoding happen on the caller's task.
//!
//! ```text
//! accept task ──spawn──▶ client task (handshake, reader)
//!                              │            ▲
//!                        ServerEvent   FramebufferUpdate
//!                              ▼            │
//!                        RfbServer::service ─┘ (writer task)
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::error::FbvncError;
use crate::input::handler::InputHandler;
use crate::rfb::adapter::ProtocolAdapter;
use crate::rfb::codec::RfbCodec;
use crate::rfb::handshake::handshake;
use crate::rfb::protocol::{
    ClientMessage, FramebufferUpdate, PixelFormat, ProtocolVersion, RawRect, ServerInit,
};
use crate::screen::types::DirtyRect;

pub type ClientId = u64;

/// Deadline for a new connection to finish the handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

const EVENT_QUEUE: usize = 256;
const UPDATE_QUEUE: usize = 2;

// ── Events from connection tasks ─────────────────────────────────

#[derive(Debug)]
enum ServerEvent {
    Connected {
        id: ClientId,
        peer: SocketAddr,
        version: ProtocolVersion,
        updates: mpsc::Sender<FramebufferUpdate>,
    },
    Message {
        id: ClientId,
        message: ClientMessage,
    },
    Disconnected {
        id: ClientId,
        reason: Option<FbvncError>,
    },
}

// ── Per-client state ─────────────────────────────────────────────

#[derive(Debug)]
struct ClientState {
    peer: SocketAddr,
    updates: mpsc::Sender<FramebufferUpdate>,
    format: PixelFormat,
    /// Area of the outstanding FramebufferUpdateRequest, if any.
    requested: Option<DirtyRect>,
    /// Area changed since the last update sent to this client.
    dirty: Option<DirtyRect>,
}

impl ClientState {
    fn mark_dirty(&mut self, rect: DirtyRect) {
        self.dirty = Some(match self.dirty {
            Some(dirty) => dirty.union(&rect),
            None => rect,
        });
    }
}

// ── RfbServer ────────────────────────────────────────────────────

/// RFB server for a single fixed-size framebuffer.
pub struct RfbServer {
    bounds: DirtyRect,
    local_addr: SocketAddr,
    events: mpsc::Receiver<ServerEvent>,
    clients: HashMap<ClientId, ClientState>,
    acceptor: JoinHandle<()>,
}

impl RfbServer {
    /// Bind the listener and start accepting clients.
    pub async fn bind(addr: impl ToSocketAddrs, init: ServerInit) -> Result<Self, FbvncError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let bounds = DirtyRect::new(0, 0, init.width.into(), init.height.into());

        let (events_tx, events) = mpsc::channel(EVENT_QUEUE);
        let acceptor = tokio::spawn(accept_loop(listener, Arc::new(init), events_tx));

        info!(%local_addr, "RFB server listening");
        Ok(Self {
            bounds,
            local_addr,
            events,
            clients: HashMap::new(),
            acceptor,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn handle_event(&mut self, event: ServerEvent, handler: &mut dyn InputHandler) {
        match event {
            ServerEvent::Connected {
                id,
                peer,
                version,
                updates,
            } => {
                info!(client = id, %peer, ?version, "client connected");
                self.clients.insert(
                    id,
                    ClientState {
                        peer,
                        updates,
                        format: PixelFormat::server_native(),
                        requested: None,
                        dirty: Some(self.bounds),
                    },
                );
            }
            ServerEvent::Message { id, message } => self.handle_message(id, message, handler),
            ServerEvent::Disconnected { id, reason } => {
                if let Some(client) = self.clients.remove(&id) {
                    match reason {
                        Some(e) => warn!(client = id, peer = %client.peer, "client dropped: {e}"),
                        None => info!(client = id, peer = %client.peer, "client disconnected"),
                    }
                }
            }
        }
    }

    fn handle_message(&mut self, id: ClientId, message: ClientMessage, handler: &mut dyn InputHandler) {
        let bounds = self.bounds;
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };

        match message {
            ClientMessage::SetPixelFormat(format) => {
                if format.is_supported() {
                    debug!(client = id, ?format, "pixel format set");
                    client.format = format;
                } else {
                    warn!(client = id, ?format, "unsupported pixel format; keeping current");
                }
            }
            ClientMessage::SetEncodings(encodings) => {
                debug!(client = id, ?encodings, "encodings offered; using Raw");
            }
            ClientMessage::FramebufferUpdateRequest { incremental, area } => {
                let Some(area) = area.intersect(&bounds) else {
                    return;
                };
                if !incremental {
                    client.mark_dirty(area);
                }
                client.requested = Some(match client.requested {
                    Some(pending) => pending.union(&area),
                    None => area,
                });
            }
            ClientMessage::KeyEvent { down, keysym } => handler.on_key(keysym, down.into()),
            ClientMessage::PointerEvent { buttons, x, y } => handler.on_pointer(buttons, x, y),
            ClientMessage::ClientCutText(text) => {
                debug!(client = id, len = text.len(), "cut text ignored");
            }
        }
    }

    /// Send an update to every client with both a pending request and
    /// changes inside it.
    fn flush_updates(&mut self, frame: &[u16]) {
        let stride = self.bounds.width as usize;
        let mut closed = Vec::new();

        for (&id, client) in self.clients.iter_mut() {
            let (Some(requested), Some(dirty)) = (client.requested, client.dirty) else {
                continue;
            };
            let Some(area) = dirty.intersect(&requested) else {
                continue;
            };

            let update = FramebufferUpdate {
                rects: vec![RawRect {
                    area,
                    pixels: encode_raw(frame, stride, &area, &client.format),
                }],
            };
            match client.updates.try_send(update) {
                Ok(()) => {
                    client.requested = None;
                    if area == dirty {
                        client.dirty = None;
                    }
                }
                Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        for id in closed {
            self.clients.remove(&id);
        }
    }
}

impl Drop for RfbServer {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

#[async_trait]
impl ProtocolAdapter for RfbServer {
    fn notify_dirty(&mut self, rect: DirtyRect) {
        let Some(rect) = rect.intersect(&self.bounds) else {
            return;
        };
        for client in self.clients.values_mut() {
            client.mark_dirty(rect);
        }
    }

    fn client_count(&self) -> usize {
        self.clients.len()
    }

    async fn service(
        &mut self,
        timeout: Duration,
        frame: &[u16],
        handler: &mut dyn InputHandler,
    ) -> Result<usize, FbvncError> {
        let expected = self.bounds.width as usize * self.bounds.height as usize;
        if frame.len() != expected {
            return Err(FbvncError::BufferLength {
                expected,
                actual: frame.len(),
            });
        }

        match tokio::time::timeout(timeout, self.events.recv()).await {
            Ok(Some(event)) => self.handle_event(event, handler),
            Ok(None) => return Err(FbvncError::ChannelClosed),
            Err(_) => {}
        }
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event, handler);
        }

        self.flush_updates(frame);
        Ok(self.clients.len())
    }
}

// ── Raw encoding ─────────────────────────────────────────────────

/// Copy `area` out of a row-major 5-5-5 frame in the client's format.
fn encode_raw(frame: &[u16], stride: usize, area: &DirtyRect, format: &PixelFormat) -> Bytes {
    let (x, width) = (area.x as usize, area.width as usize);
    let mut buf = BytesMut::with_capacity(width * area.height as usize * format.bytes_per_pixel());
    for y in area.y as usize..area.bottom() as usize {
        let row = &frame[y * stride + x..y * stride + x + width];
        for &pixel in row {
            format.encode_pixel(pixel, &mut buf);
        }
    }
    buf.freeze()
}

// ── Connection tasks ─────────────────────────────────────────────

async fn accept_loop(
    listener: TcpListener,
    init: Arc<ServerInit>,
    events: mpsc::Sender<ServerEvent>,
) {
    let mut next_id: ClientId = 1;
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("accept failed: {e}");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };
        if events.is_closed() {
            break;
        }

        let id = next_id;
        next_id += 1;
        debug!(client = id, %peer, "connection accepted");
        tokio::spawn(client_task(id, stream, peer, Arc::clone(&init), events.clone()));
    }
}

async fn client_task(
    id: ClientId,
    mut stream: TcpStream,
    peer: SocketAddr,
    init: Arc<ServerInit>,
    events: mpsc::Sender<ServerEvent>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(client = id, "set_nodelay failed: {e}");
    }

    let outcome = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut stream, &init))
        .await
        .unwrap_or(Err(FbvncError::Timeout(HANDSHAKE_TIMEOUT)));
    let version = match outcome {
        Ok(version) => version,
        Err(e) => {
            warn!(client = id, %peer, "handshake failed: {e}");
            return;
        }
    };

    let (mut net_writer, mut net_reader) = Framed::new(stream, RfbCodec).split();
    let (updates, mut update_rx) = mpsc::channel(UPDATE_QUEUE);

    let connected = ServerEvent::Connected {
        id,
        peer,
        version,
        updates,
    };
    if events.send(connected).await.is_err() {
        return;
    }

    // Server -> Network
    let writer = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            if let Err(e) = net_writer.send(update).await {
                debug!(client = id, "write failed: {e}");
                break;
            }
        }
    });

    // Network -> Server
    let reason = loop {
        let next = tokio::select! {
            next = net_reader.next() => next,
            _ = events.closed() => break None,
        };
        match next {
            Some(Ok(message)) => {
                if events.send(ServerEvent::Message { id, message }).await.is_err() {
                    break None;
                }
            }
            Some(Err(e)) => break Some(e),
            None => break None,
        }
    };

    writer.abort();
    let _ = events.send(ServerEvent::Disconnected { id, reason }).await;
}

// ── Tests ────────────────────────────────────────────────────────
