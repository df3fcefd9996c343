//! PC/XT scancode set 1 as consumed by the keyboard emulation driver.
//!
//! A make code is the key's code; its break code has bit 7 set.
//! Extended keys prefix both with `0xE0`.

use std::fmt;
use std::ops::Deref;

/// Prefix byte of extended keys.
pub const EXTENDED_PREFIX: u8 = 0xE0;
const BREAK_BIT: u8 = 0x80;

/// Longest sequence the keymap emits: an extended make + break.
pub const MAX_SEQUENCE_LEN: usize = 4;

// ── Key ──────────────────────────────────────────────────────────

/// One physical key on the emulated keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub code: u8,
    pub extended: bool,
}

impl Key {
    pub const fn plain(code: u8) -> Self {
        Self {
            code,
            extended: false,
        }
    }

    pub const fn extended(code: u8) -> Self {
        Self {
            code,
            extended: true,
        }
    }
}

// ── ScancodeSequence ─────────────────────────────────────────────

/// Bytes written to the input device for one key event.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ScancodeSequence {
    bytes: [u8; MAX_SEQUENCE_LEN],
    len: u8,
}

impl ScancodeSequence {
    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_SEQUENCE_LEN],
            len: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        self.bytes[self.len as usize] = byte;
        self.len += 1;
    }

    /// Append the make code of `key`.
    pub fn make(mut self, key: Key) -> Self {
        if key.extended {
            self.push(EXTENDED_PREFIX);
        }
        self.push(key.code);
        self
    }

    /// Append the break code of `key`.
    pub fn brk(mut self, key: Key) -> Self {
        if key.extended {
            self.push(EXTENDED_PREFIX);
        }
        self.push(key.code | BREAK_BIT);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl Deref for ScancodeSequence {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for ScancodeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScancodeSequence(")?;
        for (i, b) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02X}")?;
        }
        write!(f, ")")
    }
}

// ── Named keys ───────────────────────────────────────────────────

pub const ESCAPE: Key = Key::plain(0x01);
pub const DIGIT_1: Key = Key::plain(0x02);
pub const DIGIT_2: Key = Key::plain(0x03);
pub const DIGIT_3: Key = Key::plain(0x04);
pub const DIGIT_4: Key = Key::plain(0x05);
pub const DIGIT_5: Key = Key::plain(0x06);
pub const DIGIT_6: Key = Key::plain(0x07);
pub const DIGIT_7: Key = Key::plain(0x08);
pub const DIGIT_8: Key = Key::plain(0x09);
pub const DIGIT_9: Key = Key::plain(0x0A);
pub const DIGIT_0: Key = Key::plain(0x0B);
pub const MINUS: Key = Key::plain(0x0C);
pub const EQUAL: Key = Key::plain(0x0D);
pub const BACKSPACE: Key = Key::plain(0x0E);
pub const TAB: Key = Key::plain(0x0F);
pub const Q: Key = Key::plain(0x10);
pub const W: Key = Key::plain(0x11);
pub const E: Key = Key::plain(0x12);
pub const R: Key = Key::plain(0x13);
pub const T: Key = Key::plain(0x14);
pub const Y: Key = Key::plain(0x15);
pub const U: Key = Key::plain(0x16);
pub const I: Key = Key::plain(0x17);
pub const O: Key = Key::plain(0x18);
pub const P: Key = Key::plain(0x19);
pub const LEFT_BRACE: Key = Key::plain(0x1A);
pub const RIGHT_BRACE: Key = Key::plain(0x1B);
pub const ENTER: Key = Key::plain(0x1C);
pub const A: Key = Key::plain(0x1E);
pub const S: Key = Key::plain(0x1F);
pub const D: Key = Key::plain(0x20);
pub const F: Key = Key::plain(0x21);
pub const G: Key = Key::plain(0x22);
pub const H: Key = Key::plain(0x23);
pub const J: Key = Key::plain(0x24);
pub const K: Key = Key::plain(0x25);
pub const L: Key = Key::plain(0x26);
pub const SEMICOLON: Key = Key::plain(0x27);
pub const QUOTE: Key = Key::plain(0x28);
pub const TILDE: Key = Key::plain(0x29);
pub const LEFT_SHIFT: Key = Key::plain(0x2A);
pub const BACKSLASH: Key = Key::plain(0x2B);
pub const Z: Key = Key::plain(0x2C);
pub const X: Key = Key::plain(0x2D);
pub const C: Key = Key::plain(0x2E);
pub const V: Key = Key::plain(0x2F);
pub const B: Key = Key::plain(0x30);
pub const N: Key = Key::plain(0x31);
pub const M: Key = Key::plain(0x32);
pub const COMMA: Key = Key::plain(0x33);
pub const PERIOD: Key = Key::plain(0x34);
pub const SLASH: Key = Key::plain(0x35);
pub const KP_MULTIPLY: Key = Key::plain(0x37);
pub const SPACE: Key = Key::plain(0x39);
pub const F1: Key = Key::plain(0x3B);
pub const F3: Key = Key::plain(0x3D);
pub const F4: Key = Key::plain(0x3E);
pub const F5: Key = Key::plain(0x3F);
pub const KP_7: Key = Key::plain(0x47);
pub const KP_8: Key = Key::plain(0x48);
pub const KP_9: Key = Key::plain(0x49);
pub const KP_MINUS: Key = Key::plain(0x4A);
pub const KP_4: Key = Key::plain(0x4B);
pub const KP_5: Key = Key::plain(0x4C);
pub const KP_6: Key = Key::plain(0x4D);
pub const KP_PLUS: Key = Key::plain(0x4E);
pub const KP_1: Key = Key::plain(0x4F);
pub const KP_2: Key = Key::plain(0x50);
pub const KP_3: Key = Key::plain(0x51);
pub const KP_0: Key = Key::plain(0x52);
pub const KP_DECIMAL: Key = Key::plain(0x53);

pub const KP_SLASH: Key = Key::extended(0x35);
pub const HOME: Key = Key::extended(0x47);
pub const ARROW_UP: Key = Key::extended(0x48);
pub const ARROW_LEFT: Key = Key::extended(0x4B);
pub const ARROW_RIGHT: Key = Key::extended(0x4D);
pub const END: Key = Key::extended(0x4F);
pub const ARROW_DOWN: Key = Key::extended(0x50);
pub const PAGE_DOWN: Key = Key::extended(0x51);
pub const DELETE: Key = Key::extended(0x53);
pub const WAKE: Key = Key::extended(0x63);
pub const WWW_BACK: Key = Key::extended(0x6A);
