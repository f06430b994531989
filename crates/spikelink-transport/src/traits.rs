use std::io::{Read, Write};

use crate::error::{Result, TransportError};

/// An outbound byte sink with an explicit open/close lifecycle.
///
/// Writes are whole-message operations: an implementation either writes every
/// byte of `bytes` or returns an error. Callers that share a transport
/// serialize access themselves (the executor holds it behind a mutex), so
/// implementations need not be `Sync`.
pub trait Transport: Send {
    /// Open the underlying device or stream. Opening an open transport is a no-op.
    fn open(&mut self) -> Result<()>;

    /// Write one complete message.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the transport. Closing a closed transport is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Whether the transport is currently open.
    fn is_open(&self) -> bool;

    /// Human-readable name for diagnostics (device path, "memory", ...).
    fn name(&self) -> &str;

    /// Obtain an independent handle for the inbound half of the link.
    ///
    /// The returned reader feeds the single delivery path. Transports without
    /// an inbound stream (e.g. [`crate::MemoryTransport`]) return
    /// [`TransportError::Unsupported`].
    fn try_reader(&self) -> Result<Box<dyn Read + Send>> {
        Err(TransportError::Unsupported(format!(
            "{} has no inbound stream",
            self.name()
        )))
    }
}

/// A connected duplex stream that can hand out a second handle for reading.
pub trait DuplexStream: Read + Write + Send + Sized + 'static {
    /// Clone the handle (new file descriptor, same underlying stream).
    fn try_clone_stream(&self) -> std::io::Result<Self>;

    /// Tear down both directions so a blocked reader wakes up.
    ///
    /// Plain files and TTYs cannot be shut down; dropping the handle is all
    /// that happens for them.
    fn shutdown_stream(&self) -> std::io::Result<()> {
        Ok(())
    }
}

impl DuplexStream for std::fs::File {
    fn try_clone_stream(&self) -> std::io::Result<Self> {
        self.try_clone()
    }
}

#[cfg(unix)]
impl DuplexStream for std::os::unix::net::UnixStream {
    fn try_clone_stream(&self) -> std::io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_stream(&self) -> std::io::Result<()> {
        match self.shutdown(std::net::Shutdown::Both) {
            Err(err) if err.kind() != std::io::ErrorKind::NotConnected => Err(err),
            _ => Ok(()),
        }
    }
}

impl DuplexStream for std::net::TcpStream {
    fn try_clone_stream(&self) -> std::io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_stream(&self) -> std::io::Result<()> {
        match self.shutdown(std::net::Shutdown::Both) {
            Err(err) if err.kind() != std::io::ErrorKind::NotConnected => Err(err),
            _ => Ok(()),
        }
    }
}
