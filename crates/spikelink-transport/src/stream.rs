use std::io::{ErrorKind, Read};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{DuplexStream, Transport};

type Opener<S> = Box<dyn FnMut() -> Result<S> + Send>;

/// [`Transport`] over any [`DuplexStream`].
///
/// Built either from an opener (the stream is created on [`Transport::open`]
/// and can be reopened after a close) or from an already connected stream.
pub struct StreamTransport<S> {
    name: String,
    stream: Option<S>,
    opener: Option<Opener<S>>,
}

impl<S: DuplexStream> StreamTransport<S> {
    /// Create a closed transport that opens its stream with `opener`.
    pub fn new(name: impl Into<String>, opener: impl FnMut() -> Result<S> + Send + 'static) -> Self {
        Self {
            name: name.into(),
            stream: None,
            opener: Some(Box::new(opener)),
        }
    }

    /// Wrap an already connected stream. The transport starts open and
    /// cannot be reopened once closed.
    pub fn from_stream(name: impl Into<String>, stream: S) -> Self {
        Self {
            name: name.into(),
            stream: Some(stream),
            opener: None,
        }
    }

    /// Borrow the underlying stream, if open.
    pub fn get_ref(&self) -> Option<&S> {
        self.stream.as_ref()
    }
}

impl<S: DuplexStream> Transport for StreamTransport<S> {
    fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let opener = self.opener.as_mut().ok_or_else(|| {
            TransportError::Unsupported(format!("{} cannot be reopened", self.name))
        })?;
        self.stream = Some(opener()?);
        info!(transport = %self.name, "transport opened");
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::NotOpen(self.name.clone()))?;

        let mut offset = 0usize;
        while offset < bytes.len() {
            match stream.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.shutdown_stream() {
                debug!(transport = %self.name, error = %err, "stream shutdown failed");
            }
            info!(transport = %self.name, "transport closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn try_reader(&self) -> Result<Box<dyn Read + Send>> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| TransportError::NotOpen(self.name.clone()))?;
        Ok(Box::new(stream.try_clone_stream()?))
    }
}

impl<S> std::fmt::Debug for StreamTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("name", &self.name)
            .field("open", &self.stream.is_some())
            .field("reopenable", &self.opener.is_some())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn writes_whole_message_to_peer() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let mut transport = StreamTransport::from_stream("pair", left);

        transport.write(b"import hub\r\n").unwrap();

        let mut buf = [0u8; 12];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"import hub\r\n");
    }

    #[test]
    fn write_after_close_is_not_open() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut transport = StreamTransport::from_stream("pair", left);

        transport.close().unwrap();
        assert!(!transport.is_open());

        let err = transport.write(b"x").unwrap_err();
        assert!(matches!(err, TransportError::NotOpen(name) if name == "pair"));
    }

    #[test]
    fn from_stream_cannot_reopen() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut transport = StreamTransport::from_stream("pair", left);
        transport.close().unwrap();

        let err = transport.open().unwrap_err();
        assert!(matches!(err, TransportError::Unsupported(_)));
    }

    #[test]
    fn opener_runs_once_per_open() {
        let opens = Arc::new(AtomicUsize::new(0));
        let peers = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut transport = {
            let opens = Arc::clone(&opens);
            let peers = Arc::clone(&peers);
            StreamTransport::new("lazy", move || {
                opens.fetch_add(1, Ordering::SeqCst);
                let (left, right) = UnixStream::pair()?;
                peers.lock().unwrap().push(right);
                Ok(left)
            })
        };

        assert!(!transport.is_open());
        transport.open().unwrap();
        transport.open().unwrap();
        assert_eq!(opens.load(Ordering::SeqCst), 1);

        transport.close().unwrap();
        transport.open().unwrap();
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reader_sees_inbound_bytes() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let transport = StreamTransport::from_stream("pair", left);
        let mut reader = transport.try_reader().unwrap();

        right.write_all(b"!RC:0:1%").unwrap();

        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"!RC:0:1%");
    }

    #[test]
    fn close_wakes_reader_with_eof() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut transport = StreamTransport::from_stream("pair", left);
        let mut reader = transport.try_reader().unwrap();

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 4];
            reader.read(&mut buf).unwrap()
        });

        transport.close().unwrap();
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn zero_length_write_reports_closed() {
        let mut transport = StreamTransport::from_stream("zero", ZeroStream);
        let err = transport.write(b"x").unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }

    #[test]
    fn interrupted_write_retries() {
        let stream = InterruptedOnce {
            interrupted: false,
            data: Vec::new(),
        };
        let mut transport = StreamTransport::from_stream("flaky", stream);
        transport.write(b"retry").unwrap();
        assert_eq!(transport.get_ref().unwrap().data, b"retry");
    }

    struct ZeroStream;

    impl Read for ZeroStream {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for ZeroStream {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl DuplexStream for ZeroStream {
        fn try_clone_stream(&self) -> std::io::Result<Self> {
            Ok(ZeroStream)
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Read for InterruptedOnce {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl DuplexStream for InterruptedOnce {
        fn try_clone_stream(&self) -> std::io::Result<Self> {
            Err(std::io::Error::from(ErrorKind::Unsupported))
        }
    }
}
