//! X11 keysym → scancode translation.
//!
//! The table is fixed to the emulated device's layout, including its
//! odd spots (`^` is the Wake key, Page Up is F1, F2 is WWW Back).
//! Every entry is one of three emission strategies, see [`KeyAction`].

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::input::scancode::{self as sc, Key, ScancodeSequence};

/// An X11 keysym as carried by RFB KeyEvent messages.
pub type KeySym = u32;

// ── KeyDirection ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDirection {
    Down,
    Up,
}

impl From<bool> for KeyDirection {
    fn from(down: bool) -> Self {
        if down { KeyDirection::Down } else { KeyDirection::Up }
    }
}

// ── KeyAction ────────────────────────────────────────────────────

/// How a mapped keysym turns into scancodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Down ⇒ make, Up ⇒ break.
    Simple(Key),
    /// The shifted variant of a base key: Left Shift wraps the base
    /// key (shift make before the key, shift break after it).
    Shifted(Key),
    /// A full press-and-release for every event, whatever the direction.
    Collapsed(Key),
}

impl KeyAction {
    pub fn emit(self, direction: KeyDirection) -> ScancodeSequence {
        let seq = ScancodeSequence::new();
        match (self, direction) {
            (KeyAction::Simple(key), KeyDirection::Down) => seq.make(key),
            (KeyAction::Simple(key), KeyDirection::Up) => seq.brk(key),
            (KeyAction::Shifted(key), KeyDirection::Down) => seq.make(sc::LEFT_SHIFT).make(key),
            (KeyAction::Shifted(key), KeyDirection::Up) => seq.brk(key).brk(sc::LEFT_SHIFT),
            (KeyAction::Collapsed(key), _) => seq.make(key).brk(key),
        }
    }
}

// ── Keysyms ──────────────────────────────────────────────────────

/// Keysym values used by the table.
pub mod keysym {
    use super::KeySym;

    pub const BACKSPACE: KeySym = 0xff08;
    pub const TAB: KeySym = 0xff09;
    pub const RETURN: KeySym = 0xff0d;
    pub const ESCAPE: KeySym = 0xff1b;
    pub const HOME: KeySym = 0xff50;
    pub const LEFT: KeySym = 0xff51;
    pub const UP: KeySym = 0xff52;
    pub const RIGHT: KeySym = 0xff53;
    pub const DOWN: KeySym = 0xff54;
    pub const PAGE_UP: KeySym = 0xff55;
    pub const PAGE_DOWN: KeySym = 0xff56;
    pub const END: KeySym = 0xff57;

    pub const KP_SPACE: KeySym = 0xff80;
    pub const KP_TAB: KeySym = 0xff89;
    pub const KP_ENTER: KeySym = 0xff8d;
    pub const KP_HOME: KeySym = 0xff95;
    pub const KP_LEFT: KeySym = 0xff96;
    pub const KP_UP: KeySym = 0xff97;
    pub const KP_RIGHT: KeySym = 0xff98;
    pub const KP_DOWN: KeySym = 0xff99;
    pub const KP_PAGE_UP: KeySym = 0xff9a;
    pub const KP_PAGE_DOWN: KeySym = 0xff9b;
    pub const KP_END: KeySym = 0xff9c;
    pub const KP_DELETE: KeySym = 0xff9f;
    pub const KP_MULTIPLY: KeySym = 0xffaa;
    pub const KP_ADD: KeySym = 0xffab;
    pub const KP_SUBTRACT: KeySym = 0xffad;
    pub const KP_DECIMAL: KeySym = 0xffae;
    pub const KP_DIVIDE: KeySym = 0xffaf;
    pub const KP_0: KeySym = 0xffb0;

    pub const F1: KeySym = 0xffbe;
    pub const F2: KeySym = 0xffbf;
    pub const F3: KeySym = 0xffc0;
    pub const F4: KeySym = 0xffc1;
    pub const F5: KeySym = 0xffc2;

    pub const SPACE: KeySym = 0x0020;
    pub const EXCLAM: KeySym = 0x0021;
    pub const QUOTEDBL: KeySym = 0x0022;
    pub const NUMBERSIGN: KeySym = 0x0023;
    pub const DOLLAR: KeySym = 0x0024;
    pub const PERCENT: KeySym = 0x0025;
    pub const AMPERSAND: KeySym = 0x0026;
    pub const APOSTROPHE: KeySym = 0x0027;
    pub const PARENLEFT: KeySym = 0x0028;
    pub const PARENRIGHT: KeySym = 0x0029;
    pub const ASTERISK: KeySym = 0x002a;
    pub const PLUS: KeySym = 0x002b;
    pub const COMMA: KeySym = 0x002c;
    pub const MINUS: KeySym = 0x002d;
    pub const PERIOD: KeySym = 0x002e;
    pub const SLASH: KeySym = 0x002f;
    pub const DIGIT_0: KeySym = 0x0030;
    pub const COLON: KeySym = 0x003a;
    pub const SEMICOLON: KeySym = 0x003b;
    pub const LESS: KeySym = 0x003c;
    pub const EQUAL: KeySym = 0x003d;
    pub const GREATER: KeySym = 0x003e;
    pub const QUESTION: KeySym = 0x003f;
    pub const AT: KeySym = 0x0040;
    pub const UPPER_A: KeySym = 0x0041;
    pub const BRACKETLEFT: KeySym = 0x005b;
    pub const BACKSLASH: KeySym = 0x005c;
    pub const BRACKETRIGHT: KeySym = 0x005d;
    pub const ASCIICIRCUM: KeySym = 0x005e;
    pub const UNDERSCORE: KeySym = 0x005f;
    pub const GRAVE: KeySym = 0x0060;
    pub const LOWER_A: KeySym = 0x0061;
    pub const BRACELEFT: KeySym = 0x007b;
    pub const BAR: KeySym = 0x007c;
    pub const BRACERIGHT: KeySym = 0x007d;
    pub const ASCIITILDE: KeySym = 0x007e;
}

// ── Table ────────────────────────────────────────────────────────

const LETTERS: [Key; 26] = [
    sc::A, sc::B, sc::C, sc::D, sc::E, sc::F, sc::G, sc::H, sc::I, sc::J, sc::K, sc::L, sc::M,
    sc::N, sc::O, sc::P, sc::Q, sc::R, sc::S, sc::T, sc::U, sc::V, sc::W, sc::X, sc::Y, sc::Z,
];

const DIGITS: [Key; 10] = [
    sc::DIGIT_0, sc::DIGIT_1, sc::DIGIT_2, sc::DIGIT_3, sc::DIGIT_4,
    sc::DIGIT_5, sc::DIGIT_6, sc::DIGIT_7, sc::DIGIT_8, sc::DIGIT_9,
];

const KEYPAD_DIGITS: [Key; 10] = [
    sc::KP_0, sc::KP_1, sc::KP_2, sc::KP_3, sc::KP_4,
    sc::KP_5, sc::KP_6, sc::KP_7, sc::KP_8, sc::KP_9,
];

/// Keysyms with a single fixed entry; letters and digits are added
/// from the ranges above.
const FIXED_ENTRIES: &[(KeySym, KeyAction)] = {
    use self::keysym as ks;
    use KeyAction::{Collapsed, Shifted, Simple};
    &[
        (ks::BACKSPACE, Simple(sc::BACKSPACE)),
        (ks::TAB, Simple(sc::TAB)),
        (ks::KP_TAB, Simple(sc::TAB)),
        (ks::RETURN, Simple(sc::ENTER)),
        (ks::KP_ENTER, Simple(sc::ENTER)),
        (ks::ESCAPE, Simple(sc::ESCAPE)),
        (ks::SPACE, Simple(sc::SPACE)),
        (ks::KP_SPACE, Simple(sc::SPACE)),
        (ks::EXCLAM, Shifted(sc::DIGIT_1)),
        (ks::QUOTEDBL, Shifted(sc::QUOTE)),
        (ks::NUMBERSIGN, Shifted(sc::DIGIT_3)),
        (ks::DOLLAR, Shifted(sc::DIGIT_4)),
        (ks::PERCENT, Shifted(sc::DIGIT_5)),
        (ks::AMPERSAND, Shifted(sc::DIGIT_7)),
        (ks::APOSTROPHE, Simple(sc::QUOTE)),
        (ks::PARENLEFT, Shifted(sc::DIGIT_9)),
        (ks::PARENRIGHT, Shifted(sc::DIGIT_0)),
        (ks::ASTERISK, Shifted(sc::DIGIT_8)),
        (ks::KP_MULTIPLY, Simple(sc::KP_MULTIPLY)),
        (ks::PLUS, Shifted(sc::EQUAL)),
        (ks::KP_ADD, Simple(sc::KP_PLUS)),
        (ks::COMMA, Simple(sc::COMMA)),
        (ks::MINUS, Simple(sc::MINUS)),
        (ks::KP_SUBTRACT, Simple(sc::KP_MINUS)),
        (ks::PERIOD, Simple(sc::PERIOD)),
        (ks::KP_DECIMAL, Simple(sc::KP_DECIMAL)),
        (ks::SLASH, Simple(sc::SLASH)),
        (ks::KP_DIVIDE, Simple(sc::KP_SLASH)),
        (ks::COLON, Shifted(sc::SEMICOLON)),
        (ks::SEMICOLON, Simple(sc::SEMICOLON)),
        (ks::LESS, Shifted(sc::COMMA)),
        (ks::EQUAL, Simple(sc::EQUAL)),
        (ks::GREATER, Shifted(sc::PERIOD)),
        (ks::QUESTION, Shifted(sc::SLASH)),
        (ks::AT, Shifted(sc::DIGIT_2)),
        (ks::BRACKETLEFT, Simple(sc::LEFT_BRACE)),
        (ks::BACKSLASH, Simple(sc::BACKSLASH)),
        (ks::BRACKETRIGHT, Simple(sc::RIGHT_BRACE)),
        (ks::ASCIICIRCUM, Simple(sc::WAKE)),
        (ks::UNDERSCORE, Shifted(sc::MINUS)),
        (ks::GRAVE, Simple(sc::TILDE)),
        (ks::BRACELEFT, Shifted(sc::LEFT_BRACE)),
        (ks::BAR, Shifted(sc::BACKSLASH)),
        (ks::BRACERIGHT, Shifted(sc::RIGHT_BRACE)),
        (ks::ASCIITILDE, Shifted(sc::TILDE)),
        // Addition: Delete (0xFFFF) itself stays unmapped, so the
        // keypad key is the only route to the extended Delete code.
        (ks::KP_DELETE, Simple(sc::DELETE)),
        (ks::LEFT, Simple(sc::ARROW_LEFT)),
        (ks::KP_LEFT, Simple(sc::ARROW_LEFT)),
        (ks::UP, Simple(sc::ARROW_UP)),
        (ks::KP_UP, Simple(sc::ARROW_UP)),
        (ks::DOWN, Simple(sc::ARROW_DOWN)),
        (ks::KP_DOWN, Simple(sc::ARROW_DOWN)),
        (ks::RIGHT, Simple(sc::ARROW_RIGHT)),
        (ks::KP_RIGHT, Simple(sc::ARROW_RIGHT)),
        (ks::END, Simple(sc::END)),
        (ks::KP_END, Simple(sc::END)),
        (ks::HOME, Simple(sc::HOME)),
        (ks::KP_HOME, Simple(sc::HOME)),
        (ks::PAGE_DOWN, Simple(sc::PAGE_DOWN)),
        (ks::KP_PAGE_DOWN, Simple(sc::PAGE_DOWN)),
        (ks::PAGE_UP, Simple(sc::F1)),
        (ks::KP_PAGE_UP, Simple(sc::F1)),
        (ks::F1, Collapsed(sc::F1)),
        (ks::F2, Collapsed(sc::WWW_BACK)),
        (ks::F3, Collapsed(sc::F3)),
        (ks::F4, Collapsed(sc::F4)),
        (ks::F5, Collapsed(sc::F5)),
    ]
};

static KEYMAP: LazyLock<HashMap<KeySym, KeyAction>> = LazyLock::new(build_keymap);

fn build_keymap() -> HashMap<KeySym, KeyAction> {
    let mut map: HashMap<KeySym, KeyAction> = FIXED_ENTRIES.iter().copied().collect();

    for (i, &key) in LETTERS.iter().enumerate() {
        map.insert(keysym::UPPER_A + i as KeySym, KeyAction::Shifted(key));
        map.insert(keysym::LOWER_A + i as KeySym, KeyAction::Simple(key));
    }
    for (i, (&digit, &keypad)) in DIGITS.iter().zip(KEYPAD_DIGITS.iter()).enumerate() {
        map.insert(keysym::DIGIT_0 + i as KeySym, KeyAction::Simple(digit));
        map.insert(keysym::KP_0 + i as KeySym, KeyAction::Simple(keypad));
    }

    map
}

/// The table entry for `sym`, if any.
pub fn lookup(sym: KeySym) -> Option<KeyAction> {
    KEYMAP.get(&sym).copied()
}

/// Number of mapped keysyms.
pub fn mapped_count() -> usize {
    KEYMAP.len()
}

/// Translate one key event into the bytes the input device expects.
///
/// Unmapped keysyms yield `None`; that is expected, not an error.
pub fn translate(sym: KeySym, direction: KeyDirection) -> Option<ScancodeSequence> {
    lookup(sym).map(|action| action.emit(direction))
}

// ── Tests ────────────────────────────────────────────────────────
