//! Capture loop tying the frame source, diff engine and protocol
//! adapter together.
//!
//! ```text
//!            client_count() > 0
//!   ┌──────┐ ───────────────────▶ ┌────────┐
//!   │ Idle │                      │ Active │
//!   └──────┘ ◀─────────────────── └────────┘
//!            client_count() == 0
//! ```
//!
//! *Idle* only services the network, with `idle_timeout`. *Active*
//! services with `poll_timeout`, runs one diff pass, and when something
//! changed notifies the adapter and services again with `flush_timeout`
//! so the update leaves promptly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::FbvncError;
use crate::input::handler::InputHandler;
use crate::rfb::adapter::ProtocolAdapter;
use crate::screen::capture::FrameSource;
use crate::screen::delta::{BoundsPolicy, DiffEngine};

// ── SessionConfig ────────────────────────────────────────────────

/// Timing and diff behaviour of a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Network wait per cycle while no client is connected.
    pub idle_timeout: Duration,
    /// Network wait before each diff pass.
    pub poll_timeout: Duration,
    /// Network wait after a non-empty pass.
    pub flush_timeout: Duration,
    pub bounds: BoundsPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(100),
            poll_timeout: Duration::from_millis(100),
            flush_timeout: Duration::from_millis(10),
            bounds: BoundsPolicy::default(),
        }
    }
}

// ── LoopState ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Active,
}

// ── Session ──────────────────────────────────────────────────────

/// One running server instance. Single-threaded: the adapter calls
/// back into the input handler from inside [`run_cycle`](Self::run_cycle).
pub struct Session<S, A, H>
where
    S: FrameSource,
    A: ProtocolAdapter,
    H: InputHandler,
{
    source: S,
    engine: DiffEngine,
    adapter: A,
    handler: H,
    state: LoopState,
    config: SessionConfig,
    running: Arc<AtomicBool>,
    passes: u64,
    updates: u64,
}

impl<S, A, H> Session<S, A, H>
where
    S: FrameSource,
    A: ProtocolAdapter,
    H: InputHandler,
{
    /// Build a session; fails when the source geometry is not 16 bpp.
    pub fn new(source: S, adapter: A, handler: H, config: SessionConfig) -> Result<Self, FbvncError> {
        let engine = DiffEngine::with_policy(*source.geometry(), config.bounds)?;
        Ok(Self {
            source,
            engine,
            adapter,
            handler,
            state: LoopState::Idle,
            config,
            running: Arc::new(AtomicBool::new(true)),
            passes: 0,
            updates: 0,
        })
    }

    /// A cloneable handle that stops [`run`](Self::run) when cleared.
    /// Clearing it before `run` is called makes `run` return at once.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Diff passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Passes that produced a dirty rectangle.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Run cycles until stopped or an adapter/diff error occurs.
    pub async fn run(&mut self) -> Result<(), FbvncError> {
        info!(
            width = self.engine.geometry().width,
            height = self.engine.geometry().height,
            bounds = ?self.config.bounds,
            "session started"
        );

        while self.running.load(Ordering::SeqCst) {
            self.run_cycle().await?;
        }

        info!(passes = self.passes, updates = self.updates, "session stopped");
        Ok(())
    }

    /// Execute one cycle of the state machine and return the state
    /// for the next one.
    pub async fn run_cycle(&mut self) -> Result<LoopState, FbvncError> {
        match self.state {
            LoopState::Idle => {
                let clients = self
                    .adapter
                    .service(self.config.idle_timeout, self.engine.output(), &mut self.handler)
                    .await?;
                if clients > 0 {
                    info!(clients, "client present; polling framebuffer");
                    self.state = LoopState::Active;
                }
            }
            LoopState::Active => {
                if self.adapter.client_count() == 0 {
                    info!("no clients left; idling");
                    self.state = LoopState::Idle;
                    return Ok(self.state);
                }

                self.adapter
                    .service(self.config.poll_timeout, self.engine.output(), &mut self.handler)
                    .await?;

                let region = self.engine.compare_and_encode(self.source.pixels())?;
                self.passes += 1;

                if let Some(rect) = region.to_rect(self.engine.geometry()) {
                    debug!(
                        x = rect.x,
                        y = rect.y,
                        width = rect.width,
                        height = rect.height,
                        "framebuffer changed"
                    );
                    self.adapter.notify_dirty(rect);
                    self.updates += 1;
                    self.adapter
                        .service(self.config.flush_timeout, self.engine.output(), &mut self.handler)
                        .await?;
                }
            }
        }
        Ok(self.state)
    }
}

// ── Tests ────────────────────────────────────────────────────────
