use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};
use crate::opcode::{Opcode, ReplyShape, Width};
use crate::value::{MemoryValue, WireValue};

/// Length of the leading status byte of every reply.
pub const STATUS_LEN: usize = 1;

/// Fixed slot for text replies: NUL-terminated, NUL-padded.
pub const TEXT_REPLY_LEN: usize = 256;

/// Payload length of a `Status` reply.
pub const STATUS_REPLY_LEN: usize = 4;

/// Largest single-command reply (status byte + text slot).
pub const MAX_REPLY_LEN: usize = STATUS_LEN + TEXT_REPLY_LEN;

/// Leading byte of every reply.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok = 0x00,
    Fail = 0xFF,
}

/// Check the status byte at the front of `reply`.
///
/// Nothing after a FAIL status is meaningful, so callers must not decode it.
pub fn check_status(reply: &[u8]) -> Result<()> {
    match reply.first().copied() {
        None => Err(FrameError::Truncated {
            needed: STATUS_LEN,
            available: 0,
        }),
        Some(byte) if byte == ReplyStatus::Ok as u8 => Ok(()),
        Some(byte) if byte == ReplyStatus::Fail as u8 => Err(FrameError::PeerFailed),
        Some(byte) => Err(FrameError::InvalidStatusByte(byte)),
    }
}

/// Emulator run state reported by `Status`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmuStatus {
    Running = 0,
    Paused = 1,
    Shutdown = 2,
}

impl EmuStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Shutdown => "shutdown",
        }
    }
}

impl TryFrom<u32> for EmuStatus {
    type Error = FrameError;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Running),
            1 => Ok(Self::Paused),
            2 => Ok(Self::Shutdown),
            other => Err(FrameError::UnknownEmuStatus(other)),
        }
    }
}

impl std::fmt::Display for EmuStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded reply payload, one variant per reply shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Empty,
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Text(String),
    Status(EmuStatus),
}

impl Reply {
    /// The shape this reply was decoded as.
    pub fn shape(&self) -> ReplyShape {
        match self {
            Self::Empty => ReplyShape::Empty,
            Self::U8(_) => ReplyShape::Int(Width::W8),
            Self::U16(_) => ReplyShape::Int(Width::W16),
            Self::U32(_) => ReplyShape::Int(Width::W32),
            Self::U64(_) => ReplyShape::Int(Width::W64),
            Self::Text(_) => ReplyShape::Text,
            Self::Status(_) => ReplyShape::Status,
        }
    }

    /// The integer payload, if this is a memory read reply.
    pub fn wire_value(&self) -> Option<WireValue> {
        match *self {
            Self::U8(v) => Some(WireValue::U8(v)),
            Self::U16(v) => Some(WireValue::U16(v)),
            Self::U32(v) => Some(WireValue::U32(v)),
            Self::U64(v) => Some(WireValue::U64(v)),
            _ => None,
        }
    }

    /// Convert a memory read reply into `V`; widths must match.
    pub fn into_value<V: MemoryValue>(self) -> Result<V> {
        match self.wire_value() {
            Some(value) => V::from_wire(value),
            None => Err(self.unexpected("integer")),
        }
    }

    /// Take the text of a string query reply.
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(other.unexpected("text")),
        }
    }

    /// The emulator status of a `Status` reply.
    pub fn into_status(self) -> Result<EmuStatus> {
        match self {
            Self::Status(status) => Ok(status),
            other => Err(other.unexpected("status")),
        }
    }

    fn unexpected(&self, expected: &'static str) -> FrameError {
        FrameError::UnexpectedReply {
            expected,
            actual: self.shape().name(),
        }
    }
}

/// Decode the payload `opcode` produced, starting at `offset` in `buf`.
///
/// The whole payload range is bounds-checked before anything is read.
pub fn decode_reply(opcode: Opcode, buf: &[u8], offset: usize) -> Result<Reply> {
    let shape = opcode.reply_shape();
    let end = offset.saturating_add(shape.len());
    let Some(mut payload) = buf.get(offset..end) else {
        return Err(FrameError::Truncated {
            needed: end,
            available: buf.len(),
        });
    };

    Ok(match shape {
        ReplyShape::Empty => Reply::Empty,
        ReplyShape::Int(width) => match WireValue::get(width, &mut payload)? {
            WireValue::U8(v) => Reply::U8(v),
            WireValue::U16(v) => Reply::U16(v),
            WireValue::U32(v) => Reply::U32(v),
            WireValue::U64(v) => Reply::U64(v),
        },
        ReplyShape::Text => {
            let text = payload.split(|&b| b == 0).next().unwrap_or_default();
            Reply::Text(String::from_utf8_lossy(text).into_owned())
        }
        ReplyShape::Status => Reply::Status(EmuStatus::try_from(payload.get_u32_ne())?),
    })
}

/// Encode `reply` as a payload into the front of `dst`.
///
/// Text is NUL-padded to the full slot. Used by peers answering requests.
pub fn encode_reply_payload(reply: &Reply, dst: &mut [u8]) -> Result<usize> {
    let len = reply.shape().len();
    if dst.len() < len {
        return Err(FrameError::Truncated {
            needed: len,
            available: dst.len(),
        });
    }
    let mut cursor = &mut dst[..len];
    match reply {
        Reply::Empty => {}
        Reply::Text(text) => {
            // One byte is always left for the terminator.
            if text.len() >= TEXT_REPLY_LEN {
                return Err(FrameError::TextTooLong {
                    len: text.len(),
                    max: TEXT_REPLY_LEN - 1,
                });
            }
            cursor.put_slice(text.as_bytes());
            cursor.put_bytes(0, TEXT_REPLY_LEN - text.len());
        }
        Reply::Status(status) => cursor.put_u32_ne(*status as u32),
        other => {
            if let Some(value) = other.wire_value() {
                value.put(&mut cursor);
            }
        }
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_byte_handling() {
        assert_eq!(check_status(&[0x00, 0xAA]), Ok(()));
        assert_eq!(check_status(&[0xFF, 0x05]), Err(FrameError::PeerFailed));
        assert_eq!(check_status(&[0x07]), Err(FrameError::InvalidStatusByte(0x07)));
        assert!(matches!(check_status(&[]), Err(FrameError::Truncated { .. })));
    }

    #[test]
    fn decode_read_reply_at_offset() {
        let mut buf = vec![0x00];
        buf.extend_from_slice(&6u32.to_ne_bytes());
        assert_eq!(decode_reply(Opcode::Read32, &buf, 1), Ok(Reply::U32(6)));
    }

    #[test]
    fn decode_out_of_range_fails() {
        let buf = [0x00, 0x01];
        assert_eq!(
            decode_reply(Opcode::Read64, &buf, 1),
            Err(FrameError::Truncated {
                needed: 9,
                available: 2
            })
        );
        assert!(decode_reply(Opcode::Read8, &buf, usize::MAX).is_err());
    }

    #[test]
    fn text_slot_round_trip() {
        let mut slot = [0xAAu8; TEXT_REPLY_LEN];
        let reply = Reply::Text("KINGDOM HEARTS II FINAL MIX".to_string());
        assert_eq!(encode_reply_payload(&reply, &mut slot), Ok(TEXT_REPLY_LEN));
        assert_eq!(slot[TEXT_REPLY_LEN - 1], 0);
        assert_eq!(decode_reply(Opcode::GameTitle, &slot, 0), Ok(reply));
    }

    #[test]
    fn text_without_terminator_space_is_rejected() {
        let mut slot = [0u8; TEXT_REPLY_LEN];
        let reply = Reply::Text("x".repeat(TEXT_REPLY_LEN));
        assert!(matches!(
            encode_reply_payload(&reply, &mut slot),
            Err(FrameError::TextTooLong { .. })
        ));
    }

    #[test]
    fn status_reply_decodes() {
        let mut buf = [0u8; STATUS_REPLY_LEN];
        encode_reply_payload(&Reply::Status(EmuStatus::Paused), &mut buf).unwrap();
        assert_eq!(
            decode_reply(Opcode::Status, &buf, 0),
            Ok(Reply::Status(EmuStatus::Paused))
        );

        let bogus = 9u32.to_ne_bytes();
        assert_eq!(
            decode_reply(Opcode::Status, &bogus, 0),
            Err(FrameError::UnknownEmuStatus(9))
        );
    }

    #[test]
    fn write_reply_is_empty() {
        assert_eq!(decode_reply(Opcode::Write64, &[0x00], 1), Ok(Reply::Empty));
    }

    #[test]
    fn typed_accessors_reject_other_shapes() {
        assert_eq!(Reply::U16(7).into_value::<u16>(), Ok(7));
        assert_eq!(
            Reply::Text("1.7.0".into()).into_value::<u32>(),
            Err(FrameError::UnexpectedReply {
                expected: "integer",
                actual: "text"
            })
        );
        assert!(Reply::Empty.into_status().is_err());
        assert_eq!(
            Reply::Status(EmuStatus::Running).into_status(),
            Ok(EmuStatus::Running)
        );
    }
}
