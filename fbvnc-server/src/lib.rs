//! # fbvnc-server: Framebuffer VNC Server
//!
//! Exports a Linux framebuffer device to RFB (VNC) clients and feeds
//! their keystrokes back into a keyboard emulation device as PC
//! scancodes.
//!
//! ## Startup
//!
//! - **Framebuffer**: mapped read-only; any failure aborts startup.
//! - **Keyboard**: opened (created if missing); failure disables input.
//! - **Listener**: binds the configured port, 5901 by default.

pub mod config;
pub mod service;
