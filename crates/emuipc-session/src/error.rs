use std::fmt;

use emuipc_frame::{FrameError, Opcode};
use emuipc_transport::TransportError;

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    /// Transport failure or FAIL status from the peer.
    Fail,
    /// A batch would exceed one of its capacity ceilings.
    OutOfMemory,
    /// Operation or value width not supported by the backend or protocol.
    Unimplemented,
    /// No classification yet. Never produced by a completed call.
    #[default]
    Unknown,
}

/// Batch capacity that ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchResource {
    MessageBytes,
    ReplyBytes,
    Operations,
}

impl fmt::Display for BatchResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MessageBytes => "message size",
            Self::ReplyBytes => "reply size",
            Self::Operations => "operation count",
        })
    }
}

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error, including a FAIL status from the peer.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The backend does not accept this opcode.
    #[error("{opcode} is not supported by {backend}")]
    Unsupported {
        opcode: Opcode,
        backend: &'static str,
    },

    /// Appending would reach a batch capacity ceiling.
    #[error("batch {resource} would reach {requested} (ceiling {limit})")]
    OutOfMemory {
        resource: BatchResource,
        requested: usize,
        limit: usize,
    },

    /// No operation at this index in the batch.
    #[error("reply index {index} out of range (batch has {len} operations)")]
    ReplyIndexOutOfRange { index: usize, len: usize },

    /// The reply was requested as a different opcode than was appended.
    #[error("operation {index} is {actual}, not {expected}")]
    ReplyMismatch {
        index: usize,
        expected: Opcode,
        actual: Opcode,
    },

    /// The batch reply buffer has not been filled by a successful send.
    #[error("batch has not been sent")]
    NotSent,
}

impl IpcError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Fail,
            Self::Frame(FrameError::UnsupportedWidth(_)) => ErrorKind::Unimplemented,
            Self::Frame(_) => ErrorKind::Fail,
            Self::Unsupported { .. } => ErrorKind::Unimplemented,
            Self::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Self::ReplyIndexOutOfRange { .. } | Self::ReplyMismatch { .. } | Self::NotSent => {
                ErrorKind::Fail
            }
        }
    }

    /// True when the peer answered with the FAIL status byte.
    pub fn is_peer_failure(&self) -> bool {
        matches!(self, Self::Frame(FrameError::PeerFailed))
    }
}

pub type Result<T> = std::result::Result<T, IpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(ErrorKind::default(), ErrorKind::Unknown);
        assert_eq!(
            IpcError::from(FrameError::UnsupportedWidth(16)).kind(),
            ErrorKind::Unimplemented
        );
        assert_eq!(IpcError::from(FrameError::PeerFailed).kind(), ErrorKind::Fail);
        assert_eq!(
            IpcError::Unsupported {
                opcode: Opcode::SaveState,
                backend: "RPCS3"
            }
            .kind(),
            ErrorKind::Unimplemented
        );
        assert_eq!(
            IpcError::OutOfMemory {
                resource: BatchResource::Operations,
                requested: 3,
                limit: 3
            }
            .kind(),
            ErrorKind::OutOfMemory
        );
        assert_eq!(
            IpcError::from(TransportError::ConnectionClosed {
                expected: 2,
                received: 0
            })
            .kind(),
            ErrorKind::Fail
        );
    }
}
