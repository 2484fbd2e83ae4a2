//! Opcode table and byte-exact frame codec for emulator IPC.
//!
//! Requests are a 1-byte opcode followed by fixed-width arguments:
//! - memory reads: `[opcode][address:4]`
//! - memory writes: `[opcode][address:4][value:1|2|4|8]`
//! - save/load state: `[opcode][slot:1]`
//! - queries: `[opcode]`
//!
//! Replies are a status byte followed by a payload whose width is fixed by
//! the opcode, so reply offsets inside a batch are known before sending.
//! Integers use host-native byte order; peer and client share a machine.

pub mod codec;
pub mod error;
pub mod opcode;
pub mod reply;
pub mod value;

pub use codec::{
    decode_batch, decode_command, write_batch_header, Command, BATCH_HEADER_LEN, MAX_COMMAND_LEN,
};
pub use error::{FrameError, Result};
pub use opcode::{Opcode, ReplyShape, Width};
pub use reply::{
    check_status, decode_reply, encode_reply_payload, EmuStatus, Reply, ReplyStatus,
    MAX_REPLY_LEN, STATUS_LEN, TEXT_REPLY_LEN,
};
pub use value::{MemoryValue, WireValue};
