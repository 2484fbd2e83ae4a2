//! Client for the emulator socket IPC protocol.
//!
//! Lets a controller program read and write the memory of a running emulator,
//! query its status and game metadata, and save or load states. Many
//! operations can be batched into a single round trip.
//!
//! # Crate Structure
//!
//! - [`transport`]: connect-per-call sockets (Unix domain or loopback TCP)
//! - [`frame`]: opcodes, request encoding and reply decoding
//! - [`session`]: sessions, the batch builder and backend capabilities
//!
//! ```no_run
//! use emuipc::session::{Backend, Session};
//!
//! # fn main() -> emuipc::session::Result<()> {
//! let session = Session::new(Backend::PCSX2);
//! println!("{} is {}", session.game_title()?, session.status()?);
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use emuipc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use emuipc_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use emuipc_session::*;
}

pub use emuipc_session::{Backend, ErrorKind, IpcError, Session};
