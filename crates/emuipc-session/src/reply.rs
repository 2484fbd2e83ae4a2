//! Reply extraction.
//!
//! A reply is located through a [`ReplySource`]: either a raw single-command
//! reply buffer addressed by byte offset, or a sent [`FinalizedBatch`]
//! addressed by operation index. Decoding is driven by the opcode and yields
//! a [`Reply`] variant.
//!
//! [`FinalizedBatch`]: crate::FinalizedBatch

use emuipc_frame::{decode_reply, Opcode, Reply};

use crate::error::Result;

/// Something a reply can be extracted from.
pub trait ReplySource {
    /// Map `place` to a byte offset into [`bytes`](Self::bytes) where the
    /// payload produced by `opcode` starts.
    fn resolve(&self, opcode: Opcode, place: usize) -> Result<usize>;

    /// The complete reply buffer, status byte included.
    fn bytes(&self) -> &[u8];
}

/// A single-command reply buffer; places are byte offsets.
#[derive(Debug, Clone, Copy)]
pub struct RawReply<'a>(&'a [u8]);

impl<'a> RawReply<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }
}

impl ReplySource for RawReply<'_> {
    fn resolve(&self, _opcode: Opcode, place: usize) -> Result<usize> {
        Ok(place)
    }

    fn bytes(&self) -> &[u8] {
        self.0
    }
}

/// Decode the reply `opcode` produced at `place` in `source`.
///
/// Every byte range is bounds-checked; a bad place fails instead of reading
/// neighbouring replies.
pub fn get_reply<S: ReplySource + ?Sized>(opcode: Opcode, source: &S, place: usize) -> Result<Reply> {
    let offset = source.resolve(opcode, place)?;
    Ok(decode_reply(opcode, source.bytes(), offset)?)
}

#[cfg(test)]
mod tests {
    use emuipc_frame::FrameError;

    use super::*;
    use crate::error::IpcError;

    #[test]
    fn raw_reply_by_byte_offset() {
        let mut buf = vec![0x00];
        buf.extend_from_slice(&0xBEEFu16.to_ne_bytes());
        let reply = get_reply(Opcode::Read16, &RawReply::new(&buf), 1).unwrap();
        assert_eq!(reply, Reply::U16(0xBEEF));
    }

    #[test]
    fn raw_reply_out_of_range() {
        let buf = [0x00, 0x01];
        let err = get_reply(Opcode::Read32, &RawReply::new(&buf), 1).unwrap_err();
        assert!(matches!(
            err,
            IpcError::Frame(FrameError::Truncated { .. })
        ));
    }
}
