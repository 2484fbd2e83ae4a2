use crate::opcode::Opcode;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The byte is not a known opcode.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// No opcode exists for a value of this many bytes.
    #[error("no opcode for {0}-byte values")]
    UnsupportedWidth(usize),

    /// A value was decoded as the wrong width.
    #[error("value width mismatch (expected {expected} bytes, got {actual})")]
    WidthMismatch { expected: usize, actual: usize },

    /// The buffer ends before the frame does.
    #[error("frame truncated ({needed} bytes needed, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// The peer answered with the FAIL status byte.
    #[error("peer reported failure")]
    PeerFailed,

    /// The status byte is neither OK nor FAIL.
    #[error("invalid reply status byte 0x{0:02x}")]
    InvalidStatusByte(u8),

    /// The emulator status value is not a known state.
    #[error("unknown emulator status {0}")]
    UnknownEmuStatus(u32),

    /// A reply was read as a different shape than it has.
    #[error("expected {expected} reply, got {actual}")]
    UnexpectedReply {
        expected: &'static str,
        actual: &'static str,
    },

    /// The opcode does not describe a standalone command.
    #[error("{} is not a standalone command", .0.name())]
    NotACommand(Opcode),

    /// Text does not fit the fixed reply slot.
    #[error("text too long ({len} bytes, max {max})")]
    TextTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
