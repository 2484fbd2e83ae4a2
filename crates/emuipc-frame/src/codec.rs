use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};
use crate::opcode::{Opcode, Width};
use crate::value::{MemoryValue, WireValue};

/// Batch envelope header: tag (1) + operation count (2).
pub const BATCH_HEADER_LEN: usize = 3;

/// Largest single request: `Write64` = opcode (1) + address (4) + value (8).
pub const MAX_COMMAND_LEN: usize = 13;

/// One request, as the caller describes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read `width` bytes of emulator memory at `address`.
    Read { width: Width, address: u32 },
    /// Write `value` to emulator memory at `address`.
    Write { address: u32, value: WireValue },
    /// Emulator version string.
    Version,
    /// Emulator run state.
    Status,
    /// Title of the running game.
    GameTitle,
    /// Serial/ID of the running game.
    GameId,
    /// Disc UUID/CRC of the running game.
    GameUuid,
    /// Version of the running game.
    GameVersion,
    /// Save state to `slot`.
    SaveState { slot: u8 },
    /// Load state from `slot`.
    LoadState { slot: u8 },
}

impl Command {
    /// Read a `V` at `address`.
    pub fn read<V: MemoryValue>(address: u32) -> Result<Self> {
        Ok(Self::Read {
            width: V::width()?,
            address,
        })
    }

    /// Write `value` at `address`.
    pub fn write<V: MemoryValue>(address: u32, value: V) -> Result<Self> {
        Ok(Self::Write {
            address,
            value: value.into_wire()?,
        })
    }

    /// The opcode this command is sent with.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Read { width, .. } => Opcode::read(*width),
            Self::Write { value, .. } => Opcode::write(value.width()),
            Self::Version => Opcode::Version,
            Self::Status => Opcode::Status,
            Self::GameTitle => Opcode::GameTitle,
            Self::GameId => Opcode::GameId,
            Self::GameUuid => Opcode::GameUuid,
            Self::GameVersion => Opcode::GameVersion,
            Self::SaveState { .. } => Opcode::SaveState,
            Self::LoadState { .. } => Opcode::LoadState,
        }
    }

    /// Encoded request length in bytes.
    pub fn encoded_len(&self) -> usize {
        self.opcode().request_len()
    }

    /// Reply payload length in bytes, status byte excluded.
    pub fn reply_len(&self) -> usize {
        self.opcode().reply_len()
    }

    /// Encode into the front of `dst`, returning the number of bytes written.
    ///
    /// Fails without writing if `dst` is too short.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<usize> {
        let len = self.encoded_len();
        if dst.len() < len {
            return Err(FrameError::Truncated {
                needed: len,
                available: dst.len(),
            });
        }
        let mut cursor = &mut dst[..len];
        self.put(&mut cursor);
        Ok(len)
    }

    /// Append the encoded command to `dst`.
    pub fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u8(self.opcode() as u8);
        match *self {
            Self::Read { address, .. } => dst.put_u32_ne(address),
            Self::Write { address, value } => {
                dst.put_u32_ne(address);
                value.put(dst);
            }
            Self::SaveState { slot } | Self::LoadState { slot } => dst.put_u8(slot),
            Self::Version
            | Self::Status
            | Self::GameTitle
            | Self::GameId
            | Self::GameUuid
            | Self::GameVersion => {}
        }
    }
}

/// Decode one command from the front of `src`.
///
/// Returns the command and the number of bytes it occupied.
pub fn decode_command(src: &[u8]) -> Result<(Command, usize)> {
    let Some(&tag) = src.first() else {
        return Err(FrameError::Truncated {
            needed: 1,
            available: 0,
        });
    };
    let opcode = Opcode::try_from(tag)?;
    let len = opcode.request_len();
    if opcode == Opcode::MultiCommand {
        return Err(FrameError::NotACommand(opcode));
    }
    if src.len() < len {
        return Err(FrameError::Truncated {
            needed: len,
            available: src.len(),
        });
    }

    let mut body = &src[1..len];
    let command = match opcode {
        Opcode::Read8 | Opcode::Read16 | Opcode::Read32 | Opcode::Read64 => Command::Read {
            width: opcode.width().ok_or(FrameError::NotACommand(opcode))?,
            address: body.get_u32_ne(),
        },
        Opcode::Write8 | Opcode::Write16 | Opcode::Write32 | Opcode::Write64 => {
            let width = opcode.width().ok_or(FrameError::NotACommand(opcode))?;
            let address = body.get_u32_ne();
            Command::Write {
                address,
                value: WireValue::get(width, &mut body)?,
            }
        }
        Opcode::Version => Command::Version,
        Opcode::Status => Command::Status,
        Opcode::GameTitle => Command::GameTitle,
        Opcode::GameId => Command::GameId,
        Opcode::GameUuid => Command::GameUuid,
        Opcode::GameVersion => Command::GameVersion,
        Opcode::SaveState => Command::SaveState {
            slot: body.get_u8(),
        },
        Opcode::LoadState => Command::LoadState {
            slot: body.get_u8(),
        },
        Opcode::Unimplemented | Opcode::MultiCommand => {
            return Err(FrameError::NotACommand(opcode))
        }
    };
    Ok((command, len))
}

/// Write the envelope header (tag and operation count) into the front of `dst`.
pub fn write_batch_header(dst: &mut [u8], count: u16) -> Result<()> {
    if dst.len() < BATCH_HEADER_LEN {
        return Err(FrameError::Truncated {
            needed: BATCH_HEADER_LEN,
            available: dst.len(),
        });
    }
    let mut cursor = &mut dst[..BATCH_HEADER_LEN];
    cursor.put_u8(Opcode::MultiCommand as u8);
    cursor.put_u16_ne(count);
    Ok(())
}

/// Decode a whole batch request: envelope header plus every command.
///
/// The message must contain exactly the announced number of commands.
pub fn decode_batch(src: &[u8]) -> Result<Vec<Command>> {
    if src.len() < BATCH_HEADER_LEN {
        return Err(FrameError::Truncated {
            needed: BATCH_HEADER_LEN,
            available: src.len(),
        });
    }
    let mut header = src;
    let tag = header.get_u8();
    if tag != Opcode::MultiCommand as u8 {
        return Err(FrameError::UnknownOpcode(tag));
    }
    let count = header.get_u16_ne() as usize;

    let mut commands = Vec::with_capacity(count);
    let mut offset = BATCH_HEADER_LEN;
    for _ in 0..count {
        let (command, used) = decode_command(&src[offset..])?;
        commands.push(command);
        offset += used;
    }
    if offset != src.len() {
        return Err(FrameError::Truncated {
            needed: offset,
            available: src.len(),
        });
    }
    Ok(commands)
}
