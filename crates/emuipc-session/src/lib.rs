//! Emulator IPC sessions.
//!
//! A [`Session`] talks to one emulator backend. Operations either go out one
//! at a time over a shared scratch buffer, or are accumulated by a
//! [`BatchBuilder`] into a single wire message whose reply offsets are known
//! before it is sent.
//!
//! ```no_run
//! use emuipc_session::{Backend, Session};
//!
//! # fn main() -> emuipc_session::Result<()> {
//! let session = Session::new(Backend::PCSX2);
//! session.write(0x0034_7D34, 5u64)?;
//! assert_eq!(session.read::<u64>(0x0034_7D34)?, 5);
//!
//! let mut batch = session.initialize_batch();
//! batch.read::<u32>(0x0034_7E44)?;
//! let title = batch.game_title()?;
//! let mut batch = batch.finalize()?;
//! session.send_batch(&mut batch)?;
//! println!("{}", batch.text(title)?);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod capability;
pub mod config;
pub mod error;
pub mod reply;
pub mod session;

pub use batch::{BatchBuilder, FinalizedBatch};
pub use capability::{Access, Backend, Capabilities, CapabilitySet};
pub use config::{
    BatchLimits, SessionConfig, MAX_BATCH_REPLY_COUNT, MAX_IPC_RETURN_SIZE, MAX_IPC_SIZE,
};
pub use error::{BatchResource, ErrorKind, IpcError, Result};
pub use reply::{get_reply, RawReply, ReplySource};
pub use session::Session;

pub use emuipc_frame::{Command, EmuStatus, MemoryValue, Opcode, Reply, WireValue, Width};
