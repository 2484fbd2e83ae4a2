use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use tracing::trace;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::traits::{IpcStream, Transport};

/// Configuration for the socket transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Emulator endpoint to connect to on every exchange.
    pub endpoint: Endpoint,
    /// Read timeout for the reply. `None` blocks until the peer answers.
    pub read_timeout: Option<Duration>,
    /// Write timeout for the request. `None` blocks until the peer drains it.
    pub write_timeout: Option<Duration>,
}

impl TransportConfig {
    /// Blocking configuration for `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Production [`Transport`]: a fresh socket connection per exchange.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    config: TransportConfig,
}

impl SocketTransport {
    /// Create a transport with explicit configuration.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Shorthand for a blocking transport to `endpoint`.
    pub fn for_endpoint(endpoint: Endpoint) -> Self {
        Self::new(TransportConfig::new(endpoint))
    }

    /// The endpoint every exchange connects to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// Current transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl SocketTransport {
    /// Connect and send `request`; the caller reads the reply.
    fn send(&self, request: &[u8]) -> Result<IpcStream> {
        let mut stream = IpcStream::connect(&self.config.endpoint)?;
        stream.set_read_timeout(self.config.read_timeout)?;
        stream.set_write_timeout(self.config.write_timeout)?;
        write_request(&mut stream, request)?;
        Ok(stream)
    }
}

impl Transport for SocketTransport {
    fn exchange(&self, request: &[u8], reply: &mut [u8]) -> Result<()> {
        let mut stream = self.send(request)?;
        read_reply(&mut stream, reply)?;
        trace!(
            request_len = request.len(),
            reply_len = reply.len(),
            "exchange complete"
        );
        // Dropping the stream closes the connection.
        Ok(())
    }

    fn exchange_until(
        &self,
        request: &[u8],
        reply: &mut [u8],
        start: usize,
        terminator: u8,
    ) -> Result<usize> {
        let mut stream = self.send(request)?;
        let received = read_reply_until(&mut stream, reply, start, terminator)?;
        trace!(
            request_len = request.len(),
            received,
            "terminated exchange complete"
        );
        Ok(received)
    }
}

/// Write every byte of `request`, retrying interrupted writes.
pub(crate) fn write_request<W: Write>(stream: &mut W, request: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < request.len() {
        match stream.write(&request[offset..]) {
            Ok(0) => return Err(TransportError::Io(ErrorKind::WriteZero.into())),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(&err) => return Err(TransportError::TimedOut("writing")),
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    loop {
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(&err) => return Err(TransportError::TimedOut("writing")),
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

/// Fill `reply` completely, retrying interrupted reads.
pub(crate) fn read_reply<R: Read>(stream: &mut R, reply: &mut [u8]) -> Result<()> {
    fill_reply(stream, reply, |_, _| false).map(|_| ())
}

/// Read until `terminator` shows up at or after `start`, or `reply` is full.
///
/// Returns the number of bytes received. Bytes past the terminator that
/// arrived in the same read are kept but not waited for.
pub(crate) fn read_reply_until<R: Read>(
    stream: &mut R,
    reply: &mut [u8],
    start: usize,
    terminator: u8,
) -> Result<usize> {
    fill_reply(stream, reply, |filled, before| {
        filled
            .get(before.max(start)..)
            .is_some_and(|fresh| fresh.contains(&terminator))
    })
}

/// Read into `reply` until it is full or `done(filled, before)` accepts the
/// bytes received so far. `before` is how many bytes were present before the
/// latest read.
fn fill_reply<R: Read>(
    stream: &mut R,
    reply: &mut [u8],
    mut done: impl FnMut(&[u8], usize) -> bool,
) -> Result<usize> {
    let mut received = 0usize;
    while received < reply.len() {
        match stream.read(&mut reply[received..]) {
            Ok(0) => {
                return Err(TransportError::ConnectionClosed {
                    expected: reply.len(),
                    received,
                })
            }
            Ok(n) => {
                let before = received;
                received += n;
                if done(&reply[..received], before) {
                    break;
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(&err) => return Err(TransportError::TimedOut("reading")),
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
    Ok(received)
}

// Unix reports an elapsed socket timeout as WouldBlock.
fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
