//! Framed RFB codec used after the handshake.
//!
//! Decodes client-to-server messages and encodes FramebufferUpdate
//! messages with Raw rectangles.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FbvncError;
use crate::input::handler::ButtonMask;
use crate::rfb::protocol::{
    ClientMessage, ENCODING_RAW, FramebufferUpdate, MSG_CLIENT_CUT_TEXT,
    MSG_FRAMEBUFFER_UPDATE, MSG_FRAMEBUFFER_UPDATE_REQUEST, MSG_KEY_EVENT, MSG_POINTER_EVENT,
    MSG_SET_ENCODINGS, MSG_SET_PIXEL_FORMAT, PixelFormat,
};
use crate::screen::types::DirtyRect;

/// Largest ClientCutText payload accepted before the connection is dropped.
pub const MAX_CUT_TEXT: usize = 1 << 20;

#[derive(Debug, Default, Clone, Copy)]
pub struct RfbCodec;

impl RfbCodec {
    /// Total length of the message at the head of `src`, or `None`
    /// until enough of its fixed part has arrived to tell.
    fn frame_len(src: &BytesMut) -> Result<Option<usize>, FbvncError> {
        let Some(&kind) = src.first() else {
            return Ok(None);
        };
        let len = match kind {
            MSG_SET_PIXEL_FORMAT => 4 + PixelFormat::SIZE,
            MSG_SET_ENCODINGS => {
                if src.len() < 4 {
                    return Ok(None);
                }
                4 + 4 * u16::from_be_bytes([src[2], src[3]]) as usize
            }
            MSG_FRAMEBUFFER_UPDATE_REQUEST => 10,
            MSG_KEY_EVENT => 8,
            MSG_POINTER_EVENT => 6,
            MSG_CLIENT_CUT_TEXT => {
                if src.len() < 8 {
                    return Ok(None);
                }
                let text = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
                if text > MAX_CUT_TEXT {
                    return Err(FbvncError::Protocol("cut text exceeds limit"));
                }
                8 + text
            }
            other => return Err(FbvncError::UnknownMessage(other)),
        };
        Ok(Some(len))
    }
}

impl Decoder for RfbCodec {
    type Item = ClientMessage;
    type Error = FbvncError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(len) = Self::frame_len(src)? else {
            return Ok(None);
        };
        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(len).freeze();
        let kind = frame.get_u8();

        let message = match kind {
            MSG_SET_PIXEL_FORMAT => {
                frame.advance(3);
                ClientMessage::SetPixelFormat(PixelFormat::read(&mut frame))
            }
            MSG_SET_ENCODINGS => {
                frame.advance(1);
                let count = frame.get_u16() as usize;
                let encodings = (0..count).map(|_| frame.get_i32()).collect();
                ClientMessage::SetEncodings(encodings)
            }
            MSG_FRAMEBUFFER_UPDATE_REQUEST => {
                let incremental = frame.get_u8() != 0;
                let x = frame.get_u16();
                let y = frame.get_u16();
                let width = frame.get_u16();
                let height = frame.get_u16();
                ClientMessage::FramebufferUpdateRequest {
                    incremental,
                    area: DirtyRect::new(x.into(), y.into(), width.into(), height.into()),
                }
            }
            MSG_KEY_EVENT => {
                let down = frame.get_u8() != 0;
                frame.advance(2);
                ClientMessage::KeyEvent {
                    down,
                    keysym: frame.get_u32(),
                }
            }
            MSG_POINTER_EVENT => ClientMessage::PointerEvent {
                buttons: ButtonMask::from_bits_retain(frame.get_u8()),
                x: frame.get_u16(),
                y: frame.get_u16(),
            },
            // MSG_CLIENT_CUT_TEXT; frame_len rejected everything else.
            _ => {
                frame.advance(7);
                ClientMessage::ClientCutText(frame)
            }
        };
        Ok(Some(message))
    }
}

impl Encoder<FramebufferUpdate> for RfbCodec {
    type Error = FbvncError;

    fn encode(&mut self, item: FramebufferUpdate, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let rect_count = u16::try_from(item.rects.len())
            .map_err(|_| FbvncError::Protocol("too many rectangles in one update"))?;
        let payload: usize = item.rects.iter().map(|r| 12 + r.pixels.len()).sum();
        dst.reserve(4 + payload);

        dst.put_u8(MSG_FRAMEBUFFER_UPDATE);
        dst.put_u8(0);
        dst.put_u16(rect_count);
        for rect in item.rects {
            dst.put_u16(rect.area.x as u16);
            dst.put_u16(rect.area.y as u16);
            dst.put_u16(rect.area.width as u16);
            dst.put_u16(rect.area.height as u16);
            dst.put_i32(ENCODING_RAW);
            dst.put_slice(&rect.pixels);
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
