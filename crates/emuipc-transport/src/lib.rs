//! Connect-per-call socket transport for emulator IPC.
//!
//! Every exchange opens a fresh connection, writes the whole request, reads
//! exactly the expected reply length, and closes. The endpoint is:
//! - a Unix domain socket under `/tmp` on Unix platforms
//! - a loopback TCP port elsewhere
//!
//! This is the lowest layer of emuipc. It moves bytes and knows nothing
//! about opcodes or status bytes.

pub mod endpoint;
pub mod error;
pub mod socket;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use socket::{SocketTransport, TransportConfig};
pub use traits::{IpcStream, Transport};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
