use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// One request/reply round trip with the emulator.
///
/// Implementations connect, send every byte of `request`, fill `reply`
/// completely, and close. The exchange fails as a unit: there is no partial
/// success.
pub trait Transport: Send + Sync {
    /// Send `request` and read exactly `reply.len()` bytes back.
    fn exchange(&self, request: &[u8], reply: &mut [u8]) -> Result<()>;

    /// Send `request` and read until a `terminator` byte arrives at or after
    /// offset `start`, or until `reply` is full. Returns the number of reply
    /// bytes received.
    ///
    /// The default reads the whole buffer.
    fn exchange_until(
        &self,
        request: &[u8],
        reply: &mut [u8],
        start: usize,
        terminator: u8,
    ) -> Result<usize> {
        let _ = (start, terminator);
        self.exchange(request, reply)?;
        Ok(reply.len())
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn exchange(&self, request: &[u8], reply: &mut [u8]) -> Result<()> {
        (**self).exchange(request, reply)
    }

    fn exchange_until(
        &self,
        request: &[u8],
        reply: &mut [u8],
        start: usize,
        terminator: u8,
    ) -> Result<usize> {
        (**self).exchange_until(request, reply, start, terminator)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn exchange(&self, request: &[u8], reply: &mut [u8]) -> Result<()> {
        (**self).exchange(request, reply)
    }

    fn exchange_until(
        &self,
        request: &[u8],
        reply: &mut [u8],
        start: usize,
        terminator: u8,
    ) -> Result<usize> {
        (**self).exchange_until(request, reply, start, terminator)
    }
}

/// A connected IPC stream over a Unix socket or loopback TCP.
///
/// On Unix this usually wraps a Unix domain socket stream; a TCP stream is
/// used for loopback endpoints.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
            IpcStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf),
            IpcStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
            IpcStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl IpcStream {
    /// Connect to an emulator endpoint (blocking).
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        let connect_err = |source| TransportError::Connect {
            endpoint: endpoint.clone(),
            source,
        };
        let stream = match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                Self::from_unix(std::os::unix::net::UnixStream::connect(path).map_err(connect_err)?)
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(connect_err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix domain sockets are not available on this platform",
                )))
            }
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr).map_err(connect_err)?;
                // Replies are tiny and latency bound.
                stream.set_nodelay(true)?;
                Self::from_tcp(stream)
            }
        };
        debug!(%endpoint, "connected to emulator endpoint");
        Ok(stream)
    }

    /// Create an IpcStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }

    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: IpcStreamInner::Tcp(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            IpcStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            IpcStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => f.debug_struct("IpcStream").field("type", &"unix").finish(),
            IpcStreamInner::Tcp(_) => f.debug_struct("IpcStream").field("type", &"tcp").finish(),
        }
    }
}
