//! Input callbacks invoked by the protocol adapter.
//!
//! [`InputDispatcher`] is the production handler: key events go
//! through the keymap into a [`KeySink`]; pointer events are ignored.

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use crate::input::device::KeySink;
use crate::input::keymap::{self, KeyDirection, KeySym};

bitflags! {
    /// RFB pointer button state, bit 0 = left button.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ButtonMask: u8 {
        const LEFT = 0x01;
        const MIDDLE = 0x02;
        const RIGHT = 0x04;
        const WHEEL_UP = 0x08;
        const WHEEL_DOWN = 0x10;
        const WHEEL_LEFT = 0x20;
        const WHEEL_RIGHT = 0x40;
        const BUTTON_8 = 0x80;
    }
}

/// Receiver of client input, called synchronously while the adapter
/// services network I/O.
pub trait InputHandler: Send {
    fn on_key(&mut self, sym: KeySym, direction: KeyDirection);
    fn on_pointer(&mut self, buttons: ButtonMask, x: u16, y: u16);
}

// ── InputDispatcher ──────────────────────────────────────────────

/// Forwards translated key events to a sink.
///
/// With no sink (the device could not be opened) key events are
/// dropped silently.
pub struct InputDispatcher<K: KeySink> {
    sink: Option<K>,
    written: u64,
    dropped: u64,
}

impl<K: KeySink> InputDispatcher<K> {
    pub fn new(sink: Option<K>) -> Self {
        Self {
            sink,
            written: 0,
            dropped: 0,
        }
    }

    pub fn sink(&self) -> Option<&K> {
        self.sink.as_ref()
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Sequences written successfully.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Sequences lost to write errors.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<K: KeySink> InputHandler for InputDispatcher<K> {
    fn on_key(&mut self, sym: KeySym, direction: KeyDirection) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        debug!("got keysym {sym:#06x} ({direction:?})");

        let Some(codes) = keymap::translate(sym, direction) else {
            return;
        };

        match sink.write_scancodes(&codes) {
            Ok(()) => self.written += 1,
            Err(e) => {
                self.dropped += 1;
                warn!("dropping key event {sym:#06x}: {e}");
            }
        }
    }

    fn on_pointer(&mut self, buttons: ButtonMask, x: u16, y: u16) {
        trace!(?buttons, x, y, "pointer event ignored");
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FbvncError;
    use crate::input::keymap::keysym;

    /// Sink that accepts only the first byte of every write.
    struct ShortSink;

    impl KeySink for ShortSink {
        fn write_scancodes(&mut self, codes: &[u8]) -> Result<(), FbvncError> {
            Err(FbvncError::ShortWrite {
                written: 1,
                expected: codes.len(),
            })
        }
    }

    #[test]
    fn mapped_key_is_written_once() {
        let mut d = InputDispatcher::new(Some(Vec::<Vec<u8>>::new()));
        d.on_key(keysym::EXCLAM, KeyDirection::Down);
        d.on_key(keysym::EXCLAM, KeyDirection::Up);
        assert_eq!(d.sink().unwrap(), &vec![vec![0x2A, 0x02], vec![0x82, 0xAA]]);
        assert_eq!(d.written(), 2);
    }

    #[test]
    fn unmapped_key_writes_nothing() {
        let mut d = InputDispatcher::new(Some(Vec::<Vec<u8>>::new()));
        d.on_key(0xFFFF, KeyDirection::Down);
        assert!(d.sink().unwrap().is_empty());
        assert_eq!(d.written(), 0);
        assert_eq!(d.dropped(), 0);
    }

    #[test]
    fn short_write_is_dropped_not_fatal() {
        let mut d = InputDispatcher::new(Some(ShortSink));
        d.on_key(keysym::F2, KeyDirection::Down);
        d.on_key(keysym::F2, KeyDirection::Up);
        assert_eq!(d.dropped(), 2);
        assert_eq!(d.written(), 0);
    }

    #[test]
    fn missing_sink_ignores_keys() {
        let mut d: InputDispatcher<Vec<Vec<u8>>> = InputDispatcher::new(None);
        d.on_key(keysym::RETURN, KeyDirection::Down);
        assert!(!d.has_sink());
        assert_eq!(d.written(), 0);
        assert_eq!(d.dropped(), 0);
    }

    #[test]
    fn pointer_is_a_no_op() {
        let mut d = InputDispatcher::new(Some(Vec::<Vec<u8>>::new()));
        d.on_pointer(ButtonMask::LEFT | ButtonMask::RIGHT, 10, 20);
        assert!(d.sink().unwrap().is_empty());
    }

    #[test]
    fn button_mask_from_wire_byte() {
        let mask = ButtonMask::from_bits_retain(0x05);
        assert!(mask.contains(ButtonMask::LEFT));
        assert!(mask.contains(ButtonMask::RIGHT));
        assert!(!mask.contains(ButtonMask::MIDDLE));
    }
}
