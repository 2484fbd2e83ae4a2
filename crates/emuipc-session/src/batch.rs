//! Batch command building.
//!
//! A batch is one wire message `[0xFF][count:2][frame_1]..[frame_N]` answered
//! by one reply `[status][payload_1]..[payload_N]`. Every opcode has a fixed
//! reply width, so each operation's reply offset is recorded while it is
//! appended, before anything is sent.

use std::sync::MutexGuard;

use emuipc_frame::{
    write_batch_header, Command, EmuStatus, MemoryValue, Opcode, Reply, BATCH_HEADER_LEN,
    STATUS_LEN,
};
use tracing::{debug, trace};

use crate::capability::Backend;
use crate::config::BatchLimits;
use crate::error::{BatchResource, IpcError, Result};
use crate::reply::{get_reply, ReplySource};
use crate::session::CommandScratch;

/// Long-lived batch assembly buffers, owned by the session.
pub(crate) struct BatchScratch {
    message: Vec<u8>,
    offsets: Vec<usize>,
    opcodes: Vec<Opcode>,
    message_len: usize,
    reply_len: usize,
}

impl BatchScratch {
    /// Allocate everything at the ceilings so appends never allocate.
    pub(crate) fn new(limits: &BatchLimits) -> Self {
        Self {
            message: vec![0; limits.max_message_len],
            offsets: Vec::with_capacity(limits.max_operations),
            opcodes: Vec::with_capacity(limits.max_operations),
            message_len: BATCH_HEADER_LEN,
            reply_len: STATUS_LEN,
        }
    }

    /// Reset counters for a new batch and write the envelope tag.
    fn begin(&mut self) {
        // Validated limits keep the buffer at least one header long.
        self.message[0] = Opcode::MultiCommand as u8;
        self.message_len = BATCH_HEADER_LEN;
        self.reply_len = STATUS_LEN;
        self.offsets.clear();
        self.opcodes.clear();
    }
}

/// An open batch. Holds the session's batch and message locks until it is
/// finalized or dropped.
///
/// Each append returns the operation's index, which is later used to
/// extract its reply from the [`FinalizedBatch`]. Calling a non-batch
/// operation of the same session on the thread holding the builder
/// deadlocks.
pub struct BatchBuilder<'a> {
    backend: Backend,
    limits: BatchLimits,
    scratch: MutexGuard<'a, BatchScratch>,
    _message: MutexGuard<'a, CommandScratch>,
    finalized: bool,
}

impl<'a> BatchBuilder<'a> {
    pub(crate) fn begin(
        backend: Backend,
        limits: BatchLimits,
        mut scratch: MutexGuard<'a, BatchScratch>,
        message: MutexGuard<'a, CommandScratch>,
    ) -> Self {
        scratch.begin();
        trace!(backend = backend.name, "batch initialized");
        Self {
            backend,
            limits,
            scratch,
            _message: message,
            finalized: false,
        }
    }

    /// Append any command.
    ///
    /// All-or-nothing: on error the batch is exactly as it was.
    pub fn push(&mut self, command: Command) -> Result<usize> {
        let opcode = self.backend.resolve(command.opcode())?;
        let scratch = &mut *self.scratch;

        let message_end = scratch.message_len + command.encoded_len();
        let reply_end = scratch.reply_len + command.reply_len();
        let count = scratch.offsets.len() + 1;
        check_ceiling(
            BatchResource::MessageBytes,
            message_end,
            self.limits.max_message_len,
        )?;
        check_ceiling(
            BatchResource::ReplyBytes,
            reply_end,
            self.limits.max_reply_len,
        )?;
        check_ceiling(BatchResource::Operations, count, self.limits.max_operations)?;

        command.encode_into(&mut scratch.message[scratch.message_len..message_end])?;

        let index = scratch.offsets.len();
        scratch.offsets.push(scratch.reply_len - STATUS_LEN);
        scratch.opcodes.push(opcode);
        scratch.message_len = message_end;
        scratch.reply_len = reply_end;
        trace!(index, %opcode, "batch operation appended");
        Ok(index)
    }

    /// Append a memory read of a `V`.
    pub fn read<V: MemoryValue>(&mut self, address: u32) -> Result<usize> {
        self.push(Command::read::<V>(address)?)
    }

    /// Append a memory write.
    pub fn write<V: MemoryValue>(&mut self, address: u32, value: V) -> Result<usize> {
        self.push(Command::write(address, value)?)
    }

    pub fn version(&mut self) -> Result<usize> {
        self.push(Command::Version)
    }

    pub fn status(&mut self) -> Result<usize> {
        self.push(Command::Status)
    }

    pub fn game_title(&mut self) -> Result<usize> {
        self.push(Command::GameTitle)
    }

    pub fn game_id(&mut self) -> Result<usize> {
        self.push(Command::GameId)
    }

    pub fn game_uuid(&mut self) -> Result<usize> {
        self.push(Command::GameUuid)
    }

    pub fn game_version(&mut self) -> Result<usize> {
        self.push(Command::GameVersion)
    }

    pub fn save_state(&mut self, slot: u8) -> Result<usize> {
        self.push(Command::SaveState { slot })
    }

    pub fn load_state(&mut self, slot: u8) -> Result<usize> {
        self.push(Command::LoadState { slot })
    }

    /// Operations appended so far.
    pub fn len(&self) -> usize {
        self.scratch.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoded message length so far, envelope header included.
    pub fn message_len(&self) -> usize {
        self.scratch.message_len
    }

    /// Expected reply length so far, status byte included.
    pub fn reply_len(&self) -> usize {
        self.scratch.reply_len
    }

    /// Reply payload offset of every operation so far.
    pub fn offsets(&self) -> &[usize] {
        &self.scratch.offsets
    }

    /// Close the batch and take an owned snapshot of it.
    ///
    /// Both session locks are released when this returns, on success or
    /// error. The scratch buffer is left as is for the next batch to
    /// overwrite.
    pub fn finalize(mut self) -> Result<FinalizedBatch> {
        self.finalized = true;
        let scratch = &mut *self.scratch;
        let count = scratch.offsets.len();
        // Limits are validated so the count always fits the header field.
        let count_field = u16::try_from(count).map_err(|_| IpcError::OutOfMemory {
            resource: BatchResource::Operations,
            requested: count,
            limit: usize::from(u16::MAX),
        })?;
        write_batch_header(&mut scratch.message, count_field)?;

        let batch = FinalizedBatch {
            message: scratch.message[..scratch.message_len].to_vec(),
            reply: vec![0; scratch.reply_len],
            offsets: scratch.offsets.clone(),
            opcodes: scratch.opcodes.clone(),
            sent: false,
        };
        debug!(
            operations = count,
            message_len = batch.message.len(),
            reply_len = batch.reply.len(),
            "batch finalized"
        );
        Ok(batch)
    }
}

impl Drop for BatchBuilder<'_> {
    fn drop(&mut self) {
        if !self.finalized {
            debug!(
                operations = self.scratch.offsets.len(),
                "batch dropped without finalize; discarding"
            );
        }
    }
}

impl std::fmt::Debug for BatchBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchBuilder")
            .field("backend", &self.backend.name)
            .field("operations", &self.len())
            .field("message_len", &self.message_len())
            .field("reply_len", &self.reply_len())
            .finish()
    }
}

fn check_ceiling(resource: BatchResource, requested: usize, limit: usize) -> Result<()> {
    if requested >= limit {
        return Err(IpcError::OutOfMemory {
            resource,
            requested,
            limit,
        });
    }
    Ok(())
}

/// An immutable, owned snapshot of a finalized batch.
///
/// Send it with [`Session::send_batch`](crate::Session::send_batch), which
/// fills the reply buffer in place, then read replies by operation index
/// as many times as needed. The same batch may be sent again; each send
/// overwrites the previous reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedBatch {
    message: Vec<u8>,
    reply: Vec<u8>,
    offsets: Vec<usize>,
    opcodes: Vec<Opcode>,
    sent: bool,
}

impl FinalizedBatch {
    /// Number of operations.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The complete wire message.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// The reply buffer, zeroed until the batch is sent.
    pub fn reply_bytes(&self) -> &[u8] {
        &self.reply
    }

    /// Reply payload offset of each operation (status byte excluded).
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Opcode of the operation at `index`.
    pub fn opcode(&self, index: usize) -> Option<Opcode> {
        self.opcodes.get(index).copied()
    }

    /// Whether the last send filled the reply buffer.
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Decode the reply of the operation at `index`.
    pub fn get(&self, index: usize) -> Result<Reply> {
        let opcode = self.opcode(index).ok_or(IpcError::ReplyIndexOutOfRange {
            index,
            len: self.len(),
        })?;
        get_reply(opcode, self, index)
    }

    /// Value read by the memory read at `index`.
    pub fn value<V: MemoryValue>(&self, index: usize) -> Result<V> {
        Ok(self.get(index)?.into_value()?)
    }

    /// Text returned by the query at `index`.
    pub fn text(&self, index: usize) -> Result<String> {
        Ok(self.get(index)?.into_text()?)
    }

    /// Emulator status returned by the `Status` at `index`.
    pub fn status(&self, index: usize) -> Result<EmuStatus> {
        Ok(self.get(index)?.into_status()?)
    }

    pub(crate) fn exchange_buffers(&mut self) -> (&[u8], &mut [u8]) {
        self.sent = false;
        (self.message.as_slice(), self.reply.as_mut_slice())
    }

    pub(crate) fn mark_sent(&mut self) {
        self.sent = true;
    }
}

impl ReplySource for FinalizedBatch {
    /// `place` is an operation index.
    fn resolve(&self, opcode: Opcode, place: usize) -> Result<usize> {
        if !self.sent {
            return Err(IpcError::NotSent);
        }
        let (Some(&offset), Some(&actual)) = (self.offsets.get(place), self.opcodes.get(place))
        else {
            return Err(IpcError::ReplyIndexOutOfRange {
                index: place,
                len: self.len(),
            });
        };
        if actual != opcode {
            return Err(IpcError::ReplyMismatch {
                index: place,
                expected: opcode,
                actual,
            });
        }
        Ok(STATUS_LEN + offset)
    }

    fn bytes(&self) -> &[u8] {
        &self.reply
    }
}
