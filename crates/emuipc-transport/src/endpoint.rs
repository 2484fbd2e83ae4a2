use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Where an emulator listens for IPC connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Filesystem-path Unix domain socket.
    Unix(PathBuf),
    /// TCP socket, normally on the loopback interface.
    Tcp(SocketAddr),
}

impl Endpoint {
    /// Directory holding the well-known Unix socket paths.
    pub const SOCKET_DIR: &'static str = "/tmp";

    /// The platform default endpoint for an emulator.
    ///
    /// Unix platforms use `/tmp/<socket_name>.sock`; everything else uses
    /// `127.0.0.1:<port>`. The choice is made at compile time.
    pub fn for_backend(socket_name: &str, port: u16) -> Self {
        #[cfg(unix)]
        {
            let _ = port;
            Self::unix_socket(socket_name)
        }
        #[cfg(not(unix))]
        {
            let _ = socket_name;
            Self::loopback(port)
        }
    }

    /// `/tmp/<socket_name>.sock`.
    pub fn unix_socket(socket_name: &str) -> Self {
        Self::Unix(PathBuf::from(Self::SOCKET_DIR).join(format!("{socket_name}.sock")))
    }

    /// `127.0.0.1:<port>`.
    pub fn loopback(port: u16) -> Self {
        Self::Tcp(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Unix(_) => "unix-domain-socket",
            Self::Tcp(_) => "tcp-loopback",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}
