use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes, BytesMut};
use spikelink_transport::{Transport, TransportError};

use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::marker::DELIMITER;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Splits any `Read` stream into delimiter-terminated chunks.
///
/// Handles partial reads internally; callers always get a chunk that ends
/// with the delimiter.
pub struct ChunkReader<T> {
    inner: T,
    buf: BytesMut,
    /// Bytes at the front of `buf` already known to hold no delimiter.
    scanned: usize,
    /// Set after an overflow: input up to the next delimiter belongs to the
    /// dropped chunk.
    discarding: bool,
    config: FrameConfig,
}

impl<T: Read> ChunkReader<T> {
    /// Create a new chunk reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new chunk reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanned: 0,
            discarding: false,
            config,
        }
    }

    /// Read the next complete chunk (blocking), delimiter included.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at EOF and
    /// `Err(FrameError::ChunkTooLarge)` when a chunk exceeds the configured
    /// maximum. The whole chunk is dropped, through its delimiter, and the
    /// reader stays usable.
    pub fn read_chunk(&mut self) -> Result<Bytes> {
        loop {
            if self.discarding {
                self.skip_discarded();
            }

            if !self.discarding {
                if let Some(offset) = self.buf[self.scanned..]
                    .iter()
                    .position(|&b| b == DELIMITER)
                {
                    let end = self.scanned + offset + 1;
                    self.scanned = 0;
                    let chunk = self.buf.split_to(end).freeze();
                    if exceeds_limit(end - 1, &self.config) {
                        return Err(FrameError::ChunkTooLarge {
                            size: end - 1,
                            max: self.config.max_chunk_size,
                        });
                    }
                    return Ok(chunk);
                }
                self.scanned = self.buf.len();

                if exceeds_limit(self.buf.len(), &self.config) {
                    let size = self.buf.len();
                    self.buf.clear();
                    self.scanned = 0;
                    self.discarding = true;
                    return Err(FrameError::ChunkTooLarge {
                        size,
                        max: self.config.max_chunk_size,
                    });
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn skip_discarded(&mut self) {
        match self.buf.iter().position(|&b| b == DELIMITER) {
            Some(offset) => {
                self.buf.advance(offset + 1);
                self.discarding = false;
            }
            None => self.buf.clear(),
        }
        self.scanned = 0;
    }

    /// Bytes buffered but not yet returned as a chunk.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current chunk reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl ChunkReader<Box<dyn Read + Send>> {
    /// Create a chunk reader over the inbound half of an open transport.
    pub fn from_transport(transport: &dyn Transport, config: FrameConfig) -> Result<Self> {
        let inner = transport.try_reader().map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

/// Chunk content (delimiter excluded) longer than the configured maximum.
fn exceeds_limit(len: usize, config: &FrameConfig) -> bool {
    len > config.max_chunk_size
}

fn transport_to_frame_error(err: TransportError) -> FrameError {
    match err {
        TransportError::Io(io) => FrameError::Io(io),
        TransportError::Open { source, .. } | TransportError::Configure { source, .. } => {
            FrameError::Io(source)
        }
        TransportError::ConnectionClosed => FrameError::ConnectionClosed,
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_single_chunk() {
        let mut reader = ChunkReader::new(Cursor::new(b"!RC:0:50%".to_vec()));
        let chunk = reader.read_chunk().unwrap();
        assert_eq!(chunk.as_ref(), b"!RC:0:50%");
    }

    #[test]
    fn splits_multiple_chunks_from_one_read() {
        let mut reader = ChunkReader::new(Cursor::new(b"!RC:0:A%CB:1:42%!RC:1:B%".to_vec()));

        assert_eq!(reader.read_chunk().unwrap().as_ref(), b"!RC:0:A%");
        assert_eq!(reader.read_chunk().unwrap().as_ref(), b"CB:1:42%");
        assert_eq!(reader.read_chunk().unwrap().as_ref(), b"!RC:1:B%");
        assert!(matches!(
            reader.read_chunk(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: b"evaluator(\"RC\", 4, \"x\")\r\n'!RC:4:ok%".to_vec(),
            pos: 0,
        };
        let mut reader = ChunkReader::new(byte_reader);
        let chunk = reader.read_chunk().unwrap();
        assert!(chunk.ends_with(b"!RC:4:ok%"));
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn connection_closed_mid_chunk() {
        let mut reader = ChunkReader::new(Cursor::new(b"!RC:0:no-delimiter".to_vec()));
        let err = reader.read_chunk().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn oversized_chunk_is_dropped_and_reader_recovers() {
        let mut wire = vec![b'x'; 20];
        wire.extend_from_slice(b"%!RC:1:ok%");
        let cfg = FrameConfig { max_chunk_size: 16 };
        let byte_reader = ByteByByteReader { bytes: wire, pos: 0 };
        let mut reader = ChunkReader::with_config(byte_reader, cfg);

        let err = reader.read_chunk().unwrap_err();
        assert!(matches!(err, FrameError::ChunkTooLarge { size: 17, max: 16 }));
        assert_eq!(reader.read_chunk().unwrap().as_ref(), b"!RC:1:ok%");
    }

    #[test]
    fn tail_of_oversized_chunk_is_never_returned() {
        let mut wire = vec![b'z'; 40];
        wire.extend_from_slice(b"CB:1:bogus-tail%CB:1:real%");
        let cfg = FrameConfig { max_chunk_size: 16 };
        let byte_reader = ByteByByteReader { bytes: wire, pos: 0 };
        let mut reader = ChunkReader::with_config(byte_reader, cfg);

        assert!(matches!(
            reader.read_chunk(),
            Err(FrameError::ChunkTooLarge { size: 17, max: 16 })
        ));
        assert_eq!(reader.read_chunk().unwrap().as_ref(), b"CB:1:real%");
        assert!(matches!(
            reader.read_chunk(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn oversized_chunk_read_in_one_piece_is_rejected() {
        let mut wire = vec![b'z'; 40];
        wire.extend_from_slice(b"CB:1:bogus-tail%CB:1:real%");
        let cfg = FrameConfig { max_chunk_size: 16 };
        let mut reader = ChunkReader::with_config(Cursor::new(wire), cfg);

        assert!(matches!(
            reader.read_chunk(),
            Err(FrameError::ChunkTooLarge { size: 55, max: 16 })
        ));
        assert_eq!(reader.read_chunk().unwrap().as_ref(), b"CB:1:real%");
        assert!(matches!(
            reader.read_chunk(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(b"CB:2:1%".to_vec()),
        };
        let mut chunks = ChunkReader::new(reader);
        assert_eq!(chunks.read_chunk().unwrap().as_ref(), b"CB:2:1%");
    }

    #[test]
    fn from_transport_without_inbound_stream_fails() {
        let (transport, _tap) = spikelink_transport::MemoryTransport::new();
        let err = ChunkReader::from_transport(&transport, FrameConfig::default())
            .err()
            .expect("memory transport has no reader");
        assert!(matches!(err, FrameError::Io(_)));
    }

    #[test]
    #[cfg(unix)]
    fn reads_from_stream_transport() {
        use std::io::Write;

        let (left, mut right) = std::os::unix::net::UnixStream::pair().unwrap();
        let transport = spikelink_transport::StreamTransport::from_stream("pair", left);
        let mut reader = ChunkReader::from_transport(&transport, FrameConfig::default()).unwrap();

        right.write_all(b">>> CB:1:pressed%").unwrap();
        assert_eq!(reader.read_chunk().unwrap().as_ref(), b">>> CB:1:pressed%");
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
