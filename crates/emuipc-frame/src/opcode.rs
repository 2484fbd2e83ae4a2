//! Wire opcodes.
//!
//! Opcode values are stable wire constants. Renumbering any of them is a
//! protocol break.

use crate::error::FrameError;
use crate::reply::{STATUS_REPLY_LEN, TEXT_REPLY_LEN};

/// Byte width of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    /// All widths, narrowest first.
    pub const ALL: [Width; 4] = [Width::W8, Width::W16, Width::W32, Width::W64];

    /// Width for a value of `size` bytes, if the protocol has one.
    pub fn from_size(size: usize) -> Option<Self> {
        match size {
            1 => Some(Self::W8),
            2 => Some(Self::W16),
            4 => Some(Self::W32),
            8 => Some(Self::W64),
            _ => None,
        }
    }

    /// Width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }
}

/// Payload layout of the reply an opcode produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// No payload.
    Empty,
    /// A fixed-width integer.
    Int(Width),
    /// NUL-terminated text in a fixed-size slot.
    Text,
    /// A 4-byte emulator status.
    Status,
}

impl ReplyShape {
    /// Payload bytes following the status byte.
    pub fn len(self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Int(width) => width.bytes(),
            Self::Text => TEXT_REPLY_LEN,
            Self::Status => STATUS_REPLY_LEN,
        }
    }

    /// True when the reply carries no payload.
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Human-readable shape name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Int(Width::W8) => "8-bit",
            Self::Int(Width::W16) => "16-bit",
            Self::Int(Width::W32) => "32-bit",
            Self::Int(Width::W64) => "64-bit",
            Self::Text => "text",
            Self::Status => "status",
        }
    }
}

/// One-byte operation tag at the start of every request.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Read8 = 0x00,
    Read16 = 0x01,
    Read32 = 0x02,
    Read64 = 0x03,
    Write8 = 0x04,
    Write16 = 0x05,
    Write32 = 0x06,
    Write64 = 0x07,
    Version = 0x08,
    SaveState = 0x09,
    LoadState = 0x0A,
    GameTitle = 0x0B,
    GameId = 0x0C,
    GameUuid = 0x0D,
    GameVersion = 0x0E,
    Status = 0x0F,
    /// Sentinel for operations with no wire encoding. Never sent.
    Unimplemented = 0xFE,
    /// Batch envelope tag.
    MultiCommand = 0xFF,
}

/// Size of the address argument of memory operations.
pub const ADDRESS_LEN: usize = 4;

impl Opcode {
    /// Every opcode that may appear as a standalone command.
    pub const COMMANDS: [Opcode; 16] = [
        Opcode::Read8,
        Opcode::Read16,
        Opcode::Read32,
        Opcode::Read64,
        Opcode::Write8,
        Opcode::Write16,
        Opcode::Write32,
        Opcode::Write64,
        Opcode::Version,
        Opcode::SaveState,
        Opcode::LoadState,
        Opcode::GameTitle,
        Opcode::GameId,
        Opcode::GameUuid,
        Opcode::GameVersion,
        Opcode::Status,
    ];

    /// Memory read opcode for `width`.
    pub fn read(width: Width) -> Self {
        match width {
            Width::W8 => Self::Read8,
            Width::W16 => Self::Read16,
            Width::W32 => Self::Read32,
            Width::W64 => Self::Read64,
        }
    }

    /// Memory write opcode for `width`.
    pub fn write(width: Width) -> Self {
        match width {
            Width::W8 => Self::Write8,
            Width::W16 => Self::Write16,
            Width::W32 => Self::Write32,
            Width::W64 => Self::Write64,
        }
    }

    /// Value width of a memory operation.
    pub fn width(self) -> Option<Width> {
        match self {
            Self::Read8 | Self::Write8 => Some(Width::W8),
            Self::Read16 | Self::Write16 => Some(Width::W16),
            Self::Read32 | Self::Write32 => Some(Width::W32),
            Self::Read64 | Self::Write64 => Some(Width::W64),
            _ => None,
        }
    }

    /// Encoded request length, opcode byte included.
    pub fn request_len(self) -> usize {
        match self {
            Self::Read8 | Self::Read16 | Self::Read32 | Self::Read64 => 1 + ADDRESS_LEN,
            Self::Write8 | Self::Write16 | Self::Write32 | Self::Write64 => {
                1 + ADDRESS_LEN + self.width().map_or(0, Width::bytes)
            }
            Self::SaveState | Self::LoadState => 2,
            Self::Version
            | Self::GameTitle
            | Self::GameId
            | Self::GameUuid
            | Self::GameVersion
            | Self::Status => 1,
            Self::MultiCommand => crate::codec::BATCH_HEADER_LEN,
            Self::Unimplemented => 0,
        }
    }

    /// Reply payload layout.
    pub fn reply_shape(self) -> ReplyShape {
        match self {
            Self::Read8 | Self::Read16 | Self::Read32 | Self::Read64 => {
                self.width().map_or(ReplyShape::Empty, ReplyShape::Int)
            }
            Self::Version | Self::GameTitle | Self::GameId | Self::GameUuid | Self::GameVersion => {
                ReplyShape::Text
            }
            Self::Status => ReplyShape::Status,
            _ => ReplyShape::Empty,
        }
    }

    /// Reply payload length, status byte excluded.
    pub fn reply_len(self) -> usize {
        self.reply_shape().len()
    }

    /// Stable name for logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Read8 => "Read8",
            Self::Read16 => "Read16",
            Self::Read32 => "Read32",
            Self::Read64 => "Read64",
            Self::Write8 => "Write8",
            Self::Write16 => "Write16",
            Self::Write32 => "Write32",
            Self::Write64 => "Write64",
            Self::Version => "Version",
            Self::SaveState => "SaveState",
            Self::LoadState => "LoadState",
            Self::GameTitle => "GameTitle",
            Self::GameId => "GameId",
            Self::GameUuid => "GameUuid",
            Self::GameVersion => "GameVersion",
            Self::Status => "Status",
            Self::Unimplemented => "Unimplemented",
            Self::MultiCommand => "MultiCommand",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = FrameError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x00 => Ok(Self::Read8),
            0x01 => Ok(Self::Read16),
            0x02 => Ok(Self::Read32),
            0x03 => Ok(Self::Read64),
            0x04 => Ok(Self::Write8),
            0x05 => Ok(Self::Write16),
            0x06 => Ok(Self::Write32),
            0x07 => Ok(Self::Write64),
            0x08 => Ok(Self::Version),
            0x09 => Ok(Self::SaveState),
            0x0A => Ok(Self::LoadState),
            0x0B => Ok(Self::GameTitle),
            0x0C => Ok(Self::GameId),
            0x0D => Ok(Self::GameUuid),
            0x0E => Ok(Self::GameVersion),
            0x0F => Ok(Self::Status),
            0xFF => Ok(Self::MultiCommand),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
