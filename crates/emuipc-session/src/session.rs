use std::sync::{Mutex, MutexGuard, PoisonError};

use emuipc_frame::{
    check_status, Command, EmuStatus, FrameError, MemoryValue, Reply, ReplyShape, ReplyStatus,
    MAX_COMMAND_LEN, MAX_REPLY_LEN, STATUS_LEN,
};
use emuipc_transport::{SocketTransport, Transport, TransportError};
use tracing::{debug, trace, warn};

use crate::batch::{BatchBuilder, BatchScratch, FinalizedBatch};
use crate::capability::Backend;
use crate::config::{BatchLimits, SessionConfig};
use crate::error::Result;
use crate::reply::{get_reply, RawReply};

/// Single-command scratch buffers, guarded by the message lock.
pub(crate) struct CommandScratch {
    request: [u8; MAX_COMMAND_LEN],
    reply: [u8; MAX_REPLY_LEN],
}

impl CommandScratch {
    fn new() -> Self {
        Self {
            request: [0; MAX_COMMAND_LEN],
            reply: [0; MAX_REPLY_LEN],
        }
    }
}

/// A client session with one emulator.
///
/// Safe to share between threads (`Arc<Session>`). Two locks guard the
/// scratch buffers:
/// - the batch lock, held by an open [`BatchBuilder`], so only one batch is
///   under construction at a time
/// - the message lock, held for one single-command round trip or for a
///   whole open batch
///
/// Every call blocks for its round trip. Nothing is retried.
pub struct Session<T = SocketTransport> {
    backend: Backend,
    limits: BatchLimits,
    transport: T,
    batch: Mutex<BatchScratch>,
    message: Mutex<CommandScratch>,
}

impl Session<SocketTransport> {
    /// Session with the backend's default endpoint and limits.
    pub fn new(backend: Backend) -> Self {
        Self::with_config(backend, SessionConfig::for_backend(&backend))
    }

    /// Session with explicit configuration.
    ///
    /// # Panics
    ///
    /// If `config.limits` cannot describe a valid batch.
    pub fn with_config(backend: Backend, config: SessionConfig) -> Self {
        Self::with_transport(backend, SocketTransport::new(config.transport), config.limits)
    }
}

impl<T: Transport> Session<T> {
    /// Session over any transport.
    ///
    /// # Panics
    ///
    /// If `limits` cannot describe a valid batch.
    pub fn with_transport(backend: Backend, transport: T, limits: BatchLimits) -> Self {
        limits.assert_valid();
        debug!(backend = backend.name, ?limits, "session created");
        Self {
            backend,
            limits,
            transport,
            batch: Mutex::new(BatchScratch::new(&limits)),
            message: Mutex::new(CommandScratch::new()),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn limits(&self) -> &BatchLimits {
        &self.limits
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one command on its own round trip.
    ///
    /// Unsupported opcodes fail before the message lock is taken or any I/O
    /// happens. Text replies end at their NUL terminator; the text slot only
    /// bounds how much is read.
    pub fn execute(&self, command: &Command) -> Result<Reply> {
        let opcode = self.backend.resolve(command.opcode())?;
        let text = opcode.reply_shape() == ReplyShape::Text;

        let mut guard = lock(&self.message);
        let scratch = &mut *guard;
        let request_len = command.encode_into(&mut scratch.request)?;
        let request = &scratch.request[..request_len];
        let reply = &mut scratch.reply[..STATUS_LEN + command.reply_len()];

        let sent = if text {
            // Clear the slot so a short reply cannot pick up an older one.
            reply.fill(0);
            self.transport
                .exchange_until(request, reply, STATUS_LEN, 0)
                .map(drop)
        } else {
            self.transport.exchange(request, reply)
        };
        if let Err(err) = settle(sent, reply, text) {
            warn!(%opcode, error = %err, "command failed");
            return Err(err);
        }
        trace!(%opcode, "command complete");
        get_reply(opcode, &RawReply::new(reply), STATUS_LEN)
    }

    /// Read a `V` from emulator memory.
    pub fn read<V: MemoryValue>(&self, address: u32) -> Result<V> {
        let reply = self.execute(&Command::read::<V>(address)?)?;
        Ok(reply.into_value()?)
    }

    /// Write `value` to emulator memory.
    pub fn write<V: MemoryValue>(&self, address: u32, value: V) -> Result<()> {
        self.execute(&Command::write(address, value)?)?;
        Ok(())
    }

    /// Emulator version string.
    pub fn version(&self) -> Result<String> {
        self.text(Command::Version)
    }

    /// Emulator run state.
    pub fn status(&self) -> Result<EmuStatus> {
        Ok(self.execute(&Command::Status)?.into_status()?)
    }

    pub fn game_title(&self) -> Result<String> {
        self.text(Command::GameTitle)
    }

    pub fn game_id(&self) -> Result<String> {
        self.text(Command::GameId)
    }

    pub fn game_uuid(&self) -> Result<String> {
        self.text(Command::GameUuid)
    }

    pub fn game_version(&self) -> Result<String> {
        self.text(Command::GameVersion)
    }

    /// Save the emulator state to `slot`.
    pub fn save_state(&self, slot: u8) -> Result<()> {
        self.execute(&Command::SaveState { slot })?;
        Ok(())
    }

    /// Load the emulator state from `slot`.
    pub fn load_state(&self, slot: u8) -> Result<()> {
        self.execute(&Command::LoadState { slot })?;
        Ok(())
    }

    fn text(&self, command: Command) -> Result<String> {
        Ok(self.execute(&command)?.into_text()?)
    }

    /// Open a batch, blocking until no other batch or single command is in
    /// flight on this session.
    pub fn initialize_batch(&self) -> BatchBuilder<'_> {
        let batch = lock(&self.batch);
        let message = lock(&self.message);
        BatchBuilder::begin(self.backend, self.limits, batch, message)
    }

    /// Send a finalized batch and fill its reply buffer.
    ///
    /// The batch owns its buffers, so no session lock is taken. On failure
    /// the emulator may or may not have applied the batch; the reply stays
    /// unreadable until a later send succeeds.
    pub fn send_batch(&self, batch: &mut FinalizedBatch) -> Result<()> {
        let operations = batch.len();
        let (message, reply) = batch.exchange_buffers();
        let sent = self.transport.exchange(message, reply);
        if let Err(err) = settle(sent, reply, false) {
            warn!(operations, error = %err, "batch failed");
            return Err(err);
        }
        batch.mark_sent();
        debug!(operations, "batch sent");
        Ok(())
    }
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend.name)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

/// Turn a finished exchange into the call's outcome.
///
/// A failing peer may close the connection right after the status byte, so a
/// short reply that starts with FAIL is a peer failure, not a transport one.
fn settle(sent: emuipc_transport::Result<()>, reply: &[u8], text: bool) -> Result<()> {
    match sent {
        Ok(()) => Ok(check_status(reply)?),
        Err(TransportError::ConnectionClosed { received, .. })
            if received >= STATUS_LEN && reply[0] == ReplyStatus::Fail as u8 =>
        {
            Err(FrameError::PeerFailed.into())
        }
        // A peer may close right after a complete NUL-terminated text.
        Err(TransportError::ConnectionClosed { received, .. })
            if text
                && reply[0] == ReplyStatus::Ok as u8
                && reply
                    .get(STATUS_LEN..received)
                    .is_some_and(|payload| payload.contains(&0)) =>
        {
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

// Scratch state is rewritten by every use, so a poisoned lock is safe to
// reuse.
fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
