//! RFB wire types.
//!
//! Only the subset the server speaks: protocol versions 3.3/3.7/3.8,
//! the six client-to-server messages, and FramebufferUpdate with Raw
//! rectangles. All multi-byte fields are big-endian on the wire
//! except pixel data, whose byte order follows the client's
//! [`PixelFormat`].

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FbvncError;
use crate::input::handler::ButtonMask;
use crate::screen::types::DirtyRect;

/// Version string the server announces.
pub const PROTOCOL_VERSION: &[u8; 12] = b"RFB 003.008\n";

/// Security type "None".
pub const SECURITY_NONE: u8 = 1;

/// Raw rectangle encoding.
pub const ENCODING_RAW: i32 = 0;

// Client → server message types.
pub const MSG_SET_PIXEL_FORMAT: u8 = 0;
pub const MSG_SET_ENCODINGS: u8 = 2;
pub const MSG_FRAMEBUFFER_UPDATE_REQUEST: u8 = 3;
pub const MSG_KEY_EVENT: u8 = 4;
pub const MSG_POINTER_EVENT: u8 = 5;
pub const MSG_CLIENT_CUT_TEXT: u8 = 6;

// Server → client message types.
pub const MSG_FRAMEBUFFER_UPDATE: u8 = 0;

// ── ProtocolVersion ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtocolVersion {
    V3_3,
    V3_7,
    V3_8,
}

impl ProtocolVersion {
    /// Parse a 12-byte `"RFB xxx.yyy\n"` version message.
    ///
    /// Unknown 3.x minors fall back to the nearest version below them.
    pub fn parse(raw: &[u8; 12]) -> Result<Self, FbvncError> {
        let unsupported = || FbvncError::UnsupportedVersion(String::from_utf8_lossy(raw).into());

        if &raw[..4] != b"RFB " || raw[7] != b'.' || raw[11] != b'\n' {
            return Err(unsupported());
        }
        let number = |digits: &[u8]| -> Option<u32> {
            std::str::from_utf8(digits).ok()?.parse().ok()
        };
        let major = number(&raw[4..7]).ok_or_else(unsupported)?;
        let minor = number(&raw[8..11]).ok_or_else(unsupported)?;

        match (major, minor) {
            (3, 0..=6) => Ok(ProtocolVersion::V3_3),
            (3, 7) => Ok(ProtocolVersion::V3_7),
            (3, _) => Ok(ProtocolVersion::V3_8),
            _ => Err(unsupported()),
        }
    }
}

// ── PixelFormat ──────────────────────────────────────────────────

/// An RFB PIXEL_FORMAT block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: bool,
    pub true_colour: bool,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    /// Encoded size on the wire, including 3 padding bytes.
    pub const SIZE: usize = 16;

    /// The 16 bpp little-endian 5-5-5 layout of the output buffer.
    pub const fn server_native() -> Self {
        Self {
            bits_per_pixel: 16,
            depth: 15,
            big_endian: false,
            true_colour: true,
            red_max: 31,
            green_max: 31,
            blue_max: 31,
            red_shift: 0,
            green_shift: 5,
            blue_shift: 10,
        }
    }

    /// Whether pixels can be translated into this format.
    ///
    /// Every channel, shifted into place, must fit inside one pixel.
    pub fn is_supported(&self) -> bool {
        let fits = |max: u16, shift: u8| {
            let width = u16::BITS - max.leading_zeros();
            u32::from(shift) + width <= u32::from(self.bits_per_pixel)
        };
        self.true_colour
            && matches!(self.bits_per_pixel, 8 | 16 | 32)
            && fits(self.red_max, self.red_shift)
            && fits(self.green_max, self.green_shift)
            && fits(self.blue_max, self.blue_shift)
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel as usize / 8
    }

    pub fn write(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.bits_per_pixel);
        dst.put_u8(self.depth);
        dst.put_u8(self.big_endian as u8);
        dst.put_u8(self.true_colour as u8);
        dst.put_u16(self.red_max);
        dst.put_u16(self.green_max);
        dst.put_u16(self.blue_max);
        dst.put_u8(self.red_shift);
        dst.put_u8(self.green_shift);
        dst.put_u8(self.blue_shift);
        dst.put_bytes(0, 3);
    }

    /// Read one block. The caller guarantees [`Self::SIZE`] bytes.
    pub fn read(src: &mut impl Buf) -> Self {
        let format = Self {
            bits_per_pixel: src.get_u8(),
            depth: src.get_u8(),
            big_endian: src.get_u8() != 0,
            true_colour: src.get_u8() != 0,
            red_max: src.get_u16(),
            green_max: src.get_u16(),
            blue_max: src.get_u16(),
            red_shift: src.get_u8(),
            green_shift: src.get_u8(),
            blue_shift: src.get_u8(),
        };
        src.advance(3);
        format
    }

    /// Translate one 5-5-5 output pixel and append it to `dst`.
    pub fn encode_pixel(&self, rgb555: u16, dst: &mut impl BufMut) {
        let scale = |v: u16, max: u16| -> u32 { u32::from(v) * u32::from(max) / 31 };
        let r = scale(rgb555 & 0x1f, self.red_max);
        let g = scale((rgb555 >> 5) & 0x1f, self.green_max);
        let b = scale((rgb555 >> 10) & 0x1f, self.blue_max);
        let value = (r << self.red_shift) | (g << self.green_shift) | (b << self.blue_shift);

        match (self.bits_per_pixel, self.big_endian) {
            (8, _) => dst.put_u8(value as u8),
            (16, false) => dst.put_u16_le(value as u16),
            (16, true) => dst.put_u16(value as u16),
            (_, false) => dst.put_u32_le(value),
            (_, true) => dst.put_u32(value),
        }
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::server_native()
    }
}

// ── ServerInit ───────────────────────────────────────────────────

/// The ServerInit message sent once per client after the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInit {
    pub width: u16,
    pub height: u16,
    pub format: PixelFormat,
    pub name: String,
}

impl ServerInit {
    pub fn new(width: u16, height: u16, name: impl Into<String>) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::server_native(),
            name: name.into(),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(24 + self.name.len());
        buf.put_u16(self.width);
        buf.put_u16(self.height);
        self.format.write(&mut buf);
        buf.put_u32(self.name.len() as u32);
        buf.put_slice(self.name.as_bytes());
        buf.freeze()
    }
}

// ── Client messages ──────────────────────────────────────────────

/// A decoded client-to-server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    SetPixelFormat(PixelFormat),
    SetEncodings(Vec<i32>),
    FramebufferUpdateRequest { incremental: bool, area: DirtyRect },
    KeyEvent { down: bool, keysym: u32 },
    PointerEvent { buttons: ButtonMask, x: u16, y: u16 },
    ClientCutText(Bytes),
}

// ── Server messages ──────────────────────────────────────────────

/// One Raw-encoded rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRect {
    pub area: DirtyRect,
    /// `width × height` pixels in the client's pixel format.
    pub pixels: Bytes,
}

/// A FramebufferUpdate message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FramebufferUpdate {
    pub rects: Vec<RawRect>,
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_versions() {
        assert_eq!(
            ProtocolVersion::parse(b"RFB 003.003\n").unwrap(),
            ProtocolVersion::V3_3
        );
        assert_eq!(
            ProtocolVersion::parse(b"RFB 003.007\n").unwrap(),
            ProtocolVersion::V3_7
        );
        assert_eq!(
            ProtocolVersion::parse(b"RFB 003.008\n").unwrap(),
            ProtocolVersion::V3_8
        );
        // Apple Remote Desktop announces 3.889.
        assert_eq!(
            ProtocolVersion::parse(b"RFB 003.889\n").unwrap(),
            ProtocolVersion::V3_8
        );
        assert_eq!(
            ProtocolVersion::parse(b"RFB 003.005\n").unwrap(),
            ProtocolVersion::V3_3
        );
    }

    #[test]
    fn rejects_garbage_versions() {
        assert!(matches!(
            ProtocolVersion::parse(b"RFB 004.000\n"),
            Err(FbvncError::UnsupportedVersion(_))
        ));
        assert!(ProtocolVersion::parse(b"HTTP/1.1 200").is_err());
        assert!(ProtocolVersion::parse(b"RFB 003.0x8\n").is_err());
    }

    #[test]
    fn pixel_format_wire_layout() {
        let mut buf = BytesMut::new();
        PixelFormat::server_native().write(&mut buf);
        assert_eq!(
            &buf[..],
            &[16, 15, 0, 1, 0, 31, 0, 31, 0, 31, 0, 5, 10, 0, 0, 0]
        );
        let parsed = PixelFormat::read(&mut buf.freeze());
        assert_eq!(parsed, PixelFormat::server_native());
    }

    #[test]
    fn server_init_layout() {
        let init = ServerInit::new(320, 240, "Android");
        let bytes = init.to_bytes();
        assert_eq!(&bytes[..4], &[0x01, 0x40, 0x00, 0xF0]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 7]);
        assert_eq!(&bytes[24..], b"Android");
    }

    #[test]
    fn native_pixels_pass_through_little_endian() {
        let mut buf = BytesMut::new();
        PixelFormat::server_native().encode_pixel(0x7C1F, &mut buf);
        assert_eq!(&buf[..], &[0x1F, 0x7C]);
    }

    #[test]
    fn translates_to_rgb888_little_endian() {
        let format = PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_colour: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        };
        let mut buf = BytesMut::new();
        format.encode_pixel(0x001F, &mut buf); // full red
        format.encode_pixel(0x7C00, &mut buf); // full blue
        assert_eq!(&buf[..], &[0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn colour_map_formats_are_unsupported() {
        let mut format = PixelFormat::server_native();
        format.true_colour = false;
        assert!(!format.is_supported());
        format.true_colour = true;
        format.bits_per_pixel = 24;
        assert!(!format.is_supported());
    }

    #[test]
    fn channels_must_fit_inside_the_pixel() {
        let wide = PixelFormat {
            bits_per_pixel: 32,
            red_shift: 40,
            ..PixelFormat::server_native()
        };
        assert!(!wide.is_supported());

        // 5 bits at shift 12 needs 17 bits.
        let overflow = PixelFormat {
            blue_shift: 12,
            ..PixelFormat::server_native()
        };
        assert!(!overflow.is_supported());

        // bgr233 is exactly 8 bits.
        let bgr233 = PixelFormat {
            bits_per_pixel: 8,
            depth: 8,
            red_max: 7,
            green_max: 7,
            blue_max: 3,
            red_shift: 0,
            green_shift: 3,
            blue_shift: 6,
            ..PixelFormat::server_native()
        };
        assert!(bgr233.is_supported());
        let mut buf = BytesMut::new();
        bgr233.encode_pixel(0x7FFF, &mut buf);
        assert_eq!(&buf[..], &[0xFF]);
    }
}
