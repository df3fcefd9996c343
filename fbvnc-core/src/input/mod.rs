//! # Input injection
//!
//! ```text
//! RFB KeyEvent (keysym, down)
//!     ↓  InputHandler::on_key
//! keymap::translate → ScancodeSequence (set 1, ≤ 4 bytes)
//!     ↓  KeySink::write_scancodes
//! KeyboardDevice (/dev/kbde)
//! ```
//!
//! Pointer events reach [`InputHandler::on_pointer`] and stop there.

pub mod device;
pub mod handler;
pub mod keymap;
pub mod scancode;

pub use device::{
    DEFAULT_KBD_DEVICE, DEFAULT_KBD_MAJOR, DEFAULT_KBD_MINOR, KeySink, KeyboardDevice,
};
pub use handler::{ButtonMask, InputDispatcher, InputHandler};
pub use keymap::{KeyAction, KeyDirection, KeySym, translate};
pub use scancode::{Key, ScancodeSequence};
