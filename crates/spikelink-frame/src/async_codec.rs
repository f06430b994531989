use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::codec::{Envelope, FrameConfig};
use crate::error::FrameError;
use crate::marker::DELIMITER;

/// `tokio_util` codec for the hub link.
///
/// Decodes delimiter-terminated chunks and encodes [`Envelope`]s. Unlike
/// [`crate::ChunkReader`], an oversized chunk is discarded in place, through
/// its delimiter, instead of surfacing as an error, because a decoder error
/// ends a `FramedRead` stream.
#[derive(Debug, Clone, Default)]
pub struct ChunkCodec {
    config: FrameConfig,
    scanned: usize,
    discarding: bool,
}

impl ChunkCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            config,
            scanned: 0,
            discarding: false,
        }
    }
}

impl Decoder for ChunkCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.discarding {
                match src.iter().position(|&b| b == DELIMITER) {
                    Some(offset) => {
                        src.advance(offset + 1);
                        self.discarding = false;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                }
                self.scanned = 0;
            }

            let Some(offset) = src[self.scanned..].iter().position(|&b| b == DELIMITER) else {
                break;
            };
            let end = self.scanned + offset + 1;
            self.scanned = 0;
            let chunk = src.split_to(end).freeze();
            if end - 1 <= self.config.max_chunk_size {
                return Ok(Some(chunk));
            }
            warn!(
                size = end - 1,
                max = self.config.max_chunk_size,
                "discarding oversized chunk"
            );
        }

        if src.len() > self.config.max_chunk_size {
            warn!(
                size = src.len(),
                max = self.config.max_chunk_size,
                "discarding oversized chunk"
            );
            src.clear();
            self.scanned = 0;
            self.discarding = true;
            return Ok(None);
        }

        self.scanned = src.len();
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(chunk) = self.decode(src)? {
            return Ok(Some(chunk));
        }
        if !src.is_empty() {
            debug!(size = src.len(), "dropping partial chunk at eof");
            src.clear();
            self.scanned = 0;
        }
        Ok(None)
    }
}

impl Encoder<Envelope<'_>> for ChunkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Envelope<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}
