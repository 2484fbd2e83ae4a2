use emuipc_frame::{BATCH_HEADER_LEN, STATUS_LEN};
use emuipc_transport::TransportConfig;

use crate::capability::Backend;

/// Default batch message ceiling, about 50,000 `Write64` requests.
pub const MAX_IPC_SIZE: usize = 650_000;

/// Default batch reply ceiling, about 50,000 `Read64` replies.
pub const MAX_IPC_RETURN_SIZE: usize = 450_000;

/// Default ceiling on operations per batch.
pub const MAX_BATCH_REPLY_COUNT: usize = 50_000;

/// Capacity ceilings of one batch.
///
/// Message length, reply length and operation count must each stay strictly
/// below their ceiling. The scratch buffers are allocated at these sizes
/// when the session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Ceiling on encoded message bytes, envelope header included.
    pub max_message_len: usize,
    /// Ceiling on reply bytes, status byte included.
    pub max_reply_len: usize,
    /// Ceiling on appended operations.
    pub max_operations: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_message_len: MAX_IPC_SIZE,
            max_reply_len: MAX_IPC_RETURN_SIZE,
            max_operations: MAX_BATCH_REPLY_COUNT,
        }
    }
}

impl BatchLimits {
    /// Panics if the ceilings cannot describe a valid batch.
    ///
    /// The message must hold the envelope header, the reply must hold the
    /// status byte, and the largest allowed count must fit the 2-byte header
    /// field.
    pub(crate) fn assert_valid(&self) {
        assert!(
            self.max_message_len > BATCH_HEADER_LEN,
            "batch message ceiling {} cannot hold the {BATCH_HEADER_LEN}-byte envelope header",
            self.max_message_len
        );
        assert!(
            self.max_reply_len > STATUS_LEN,
            "batch reply ceiling {} cannot hold the status byte",
            self.max_reply_len
        );
        assert!(
            self.max_operations <= usize::from(u16::MAX) + 1,
            "batch operation ceiling {} does not fit the 2-byte count field",
            self.max_operations
        );
    }
}

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Batch capacity ceilings.
    pub limits: BatchLimits,
    /// Socket transport settings.
    pub transport: TransportConfig,
}

impl SessionConfig {
    /// Default limits and the backend's platform endpoint, no timeouts.
    pub fn for_backend(backend: &Backend) -> Self {
        Self {
            limits: BatchLimits::default(),
            transport: TransportConfig::new(backend.endpoint()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        BatchLimits::default().assert_valid();
        let config = SessionConfig::for_backend(&Backend::PCSX2);
        assert_eq!(config.limits.max_operations, 50_000);
        assert!(config.transport.read_timeout.is_none());
    }

    #[test]
    #[should_panic(expected = "envelope header")]
    fn message_ceiling_must_hold_header() {
        BatchLimits {
            max_message_len: 3,
            ..BatchLimits::default()
        }
        .assert_valid();
    }

    #[test]
    #[should_panic(expected = "count field")]
    fn operation_ceiling_must_fit_header() {
        BatchLimits {
            max_operations: 70_000,
            ..BatchLimits::default()
        }
        .assert_valid();
    }
}
