//! Server lifecycle: open devices, bind the listener, run the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use fbvnc_core::{
    FbDevice, FbvncError, FrameSource, InputDispatcher, KeyboardDevice, RfbServer, ServerInit,
    Session,
};

use crate::config::ServerConfig;

// ── FbVncService ─────────────────────────────────────────────────

/// The top-level server.
///
/// Framebuffer and listener failures are fatal; a missing keyboard
/// device only disables input.
pub struct FbVncService {
    config: ServerConfig,
    running: Arc<AtomicBool>,
}

impl FbVncService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run the service until stopped.
    ///
    /// 1. Maps the framebuffer (fatal on failure).
    /// 2. Opens the keyboard device (input disabled on failure).
    /// 3. Binds the RFB listener.
    /// 4. Runs the session loop until `running` becomes `false`.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.running.store(true, Ordering::SeqCst);

        let frame = FbDevice::open(&self.config.framebuffer.device)?;
        let geometry = *frame.geometry();
        let too_large = |_| FbvncError::from("framebuffer exceeds RFB size limits");
        let width = u16::try_from(geometry.width).map_err(too_large)?;
        let height = u16::try_from(geometry.height).map_err(too_large)?;

        let keyboard = self.open_keyboard();

        let init = ServerInit::new(width, height, self.config.network.desktop_name.clone());
        let server = RfbServer::bind(self.config.listen_addr(), init).await?;

        let mut session = Session::new(
            frame,
            server,
            InputDispatcher::new(keyboard),
            self.config.to_session_config(),
        )?;

        tokio::select! {
            result = session.run() => result?,
            _ = Self::wait_for_stop(&self.running) => {}
        }

        self.running.store(false, Ordering::SeqCst);
        info!(
            passes = session.passes(),
            updates = session.updates(),
            "fbvnc server stopped"
        );
        Ok(())
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Internal ─────────────────────────────────────────────────

    fn open_keyboard(&self) -> Option<KeyboardDevice> {
        let kb = &self.config.keyboard;
        if !kb.enabled {
            info!("keyboard injection disabled by config");
            return None;
        }
        match KeyboardDevice::open(&kb.device, kb.major, kb.minor) {
            Ok(dev) => {
                info!(path = %dev.path().display(), "keyboard injection enabled");
                Some(dev)
            }
            Err(e) => {
                warn!("{e}; key events will be ignored");
                None
            }
        }
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_creates_with_defaults() {
        let svc = FbVncService::new(ServerConfig::default());
        assert!(!svc.is_running());
    }

    #[test]
    fn stop_handle_works() {
        let svc = FbVncService::new(ServerConfig::default());
        let handle = svc.stop_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(svc.is_running());
        svc.stop();
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn missing_framebuffer_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.framebuffer.device = dir.path().join("fb0");

        let svc = FbVncService::new(config);
        let err = svc.run().await.unwrap_err();
        assert!(err.to_string().contains("fb0"));
    }

    #[test]
    fn disabled_keyboard_opens_nothing() {
        let mut config = ServerConfig::default();
        config.keyboard.enabled = false;
        assert!(FbVncService::new(config).open_keyboard().is_none());
    }

    #[test]
    fn keyboard_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.keyboard.device = dir.path().join("missing-dir").join("kbde");
        assert!(FbVncService::new(config).open_keyboard().is_none());
    }

    #[test]
    fn keyboard_opens_existing_node() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut config = ServerConfig::default();
        config.keyboard.device = tmp.path().to_path_buf();
        let dev = FbVncService::new(config).open_keyboard().unwrap();
        assert_eq!(dev.path(), tmp.path());
    }
}
