//! Configuration for the framebuffer VNC server.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fbvnc_core::input::{DEFAULT_KBD_DEVICE, DEFAULT_KBD_MAJOR, DEFAULT_KBD_MINOR};
use fbvnc_core::screen::DEFAULT_FB_DEVICE;
use fbvnc_core::{BoundsPolicy, SessionConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings.
    pub network: NetworkConfig,
    /// Framebuffer device.
    pub framebuffer: FramebufferConfig,
    /// Keyboard emulation device.
    pub keyboard: KeyboardConfig,
    /// Loop timing and change detection.
    pub polling: PollingConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the RFB listener on.
    pub bind_address: IpAddr,
    /// TCP port for RFB clients.
    pub port: u16,
    /// Desktop name sent in ServerInit.
    pub desktop_name: String,
}

/// Framebuffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramebufferConfig {
    /// Framebuffer character device.
    pub device: PathBuf,
}

/// Keyboard injection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Forward key events at all.
    pub enabled: bool,
    /// Keyboard emulation character device.
    pub device: PathBuf,
    /// Device numbers used when the node has to be created.
    pub major: u32,
    pub minor: u32,
}

/// Polling loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Network wait while no client is connected (ms).
    pub idle_timeout_ms: u64,
    /// Network wait before each framebuffer scan (ms).
    pub poll_timeout_ms: u64,
    /// Network wait after a scan found changes (ms).
    pub flush_timeout_ms: u64,
    /// Dirty-region bounds: "legacy" or "symmetric".
    pub bounds: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5901,
            desktop_name: "Android".into(),
        }
    }
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_FB_DEVICE.into(),
        }
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: DEFAULT_KBD_DEVICE.into(),
            major: DEFAULT_KBD_MAJOR,
            minor: DEFAULT_KBD_MINOR,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 100,
            poll_timeout_ms: 100,
            flush_timeout_ms: 10,
            bounds: "legacy".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// The socket address the RFB listener binds.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.network.bind_address, self.network.port)
    }

    /// Convert the polling section into a `SessionConfig`.
    ///
    /// Zero timeouts are raised to 1 ms; an unknown bounds policy
    /// falls back to the default.
    pub fn to_session_config(&self) -> SessionConfig {
        let ms = |v: u64| Duration::from_millis(v.max(1));
        let bounds = self.polling.bounds.parse().unwrap_or_else(|e| {
            tracing::warn!("{e}; using {:?}", BoundsPolicy::default());
            BoundsPolicy::default()
        });
        SessionConfig {
            idle_timeout: ms(self.polling.idle_timeout_ms),
            poll_timeout: ms(self.polling.poll_timeout_ms),
            flush_timeout: ms(self.polling.flush_timeout_ms),
            bounds,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
