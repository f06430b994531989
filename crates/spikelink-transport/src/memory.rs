use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

#[derive(Default)]
struct Shared {
    writes: Mutex<Vec<Bytes>>,
    fail_writes: AtomicBool,
}

/// In-memory [`Transport`] that records every write.
///
/// Pair it with the returned [`WireTap`] to inspect outbound traffic or to
/// make subsequent writes fail. There is no inbound stream; tests feed
/// chunks to the executor directly.
pub struct MemoryTransport {
    open: bool,
    shared: Arc<Shared>,
}

/// Observer half of a [`MemoryTransport`].
#[derive(Clone)]
pub struct WireTap {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Create an open transport and its tap.
    pub fn new() -> (Self, WireTap) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                open: true,
                shared: Arc::clone(&shared),
            },
            WireTap { shared },
        )
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.open {
            return Err(TransportError::NotOpen("memory".to_string()));
        }
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl WireTap {
    /// Every write so far, in order.
    pub fn writes(&self) -> Vec<Bytes> {
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every write so far, decoded lossily as text.
    pub fn lines(&self) -> Vec<String> {
        self.writes()
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// The most recent write, decoded as text.
    pub fn last_line(&self) -> Option<String> {
        self.lines().pop()
    }

    /// Number of writes recorded.
    pub fn write_count(&self) -> usize {
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forget recorded writes.
    pub fn clear(&self) {
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make subsequent writes fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_writes_in_order() {
        let (mut transport, tap) = MemoryTransport::new();
        transport.write(b"one\r\n").unwrap();
        transport.write(b"two\r\n").unwrap();

        assert_eq!(tap.lines(), vec!["one\r\n", "two\r\n"]);
        assert_eq!(tap.last_line().as_deref(), Some("two\r\n"));
        assert_eq!(tap.write_count(), 2);
    }

    #[test]
    fn injected_failure_surfaces_io_error() {
        let (mut transport, tap) = MemoryTransport::new();
        tap.fail_writes(true);

        let err = transport.write(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert_eq!(tap.write_count(), 0);

        tap.fail_writes(false);
        transport.write(b"x").unwrap();
        assert_eq!(tap.write_count(), 1);
    }

    #[test]
    fn closed_transport_rejects_writes() {
        let (mut transport, _tap) = MemoryTransport::new();
        transport.close().unwrap();
        assert!(!transport.is_open());
        assert!(matches!(
            transport.write(b"x"),
            Err(TransportError::NotOpen(_))
        ));
    }

    #[test]
    fn has_no_inbound_stream() {
        let (transport, _tap) = MemoryTransport::new();
        assert!(matches!(
            transport.try_reader(),
            Err(TransportError::Unsupported(_))
        ));
    }
}
