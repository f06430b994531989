//! Inbound delivery path: pulls chunks off the link and hands them to
//! [`CommandExecutor::on_inbound_chunk`].

use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use spikelink_frame::{ChunkReader, FrameError};
use spikelink_transport::Transport;
use tracing::{info, warn};

use crate::error::Result;
use crate::executor::CommandExecutor;

/// How a delivery loop ended.
#[derive(Debug)]
pub struct DeliveryReport {
    /// Chunks handed to the executor.
    pub chunks: u64,
    /// `None` when the link closed cleanly.
    pub error: Option<FrameError>,
}

/// Handle to a delivery thread.
#[derive(Debug)]
pub struct DeliveryHandle {
    thread: JoinHandle<DeliveryReport>,
}

impl DeliveryHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the loop to end. Close the transport first to make it stop.
    pub fn join(self) -> DeliveryReport {
        self.thread.join().unwrap_or_else(|_| DeliveryReport {
            chunks: 0,
            error: Some(FrameError::Io(std::io::Error::other(
                "delivery thread panicked",
            ))),
        })
    }
}

/// Feed every chunk from `reader` to `executor` until the stream ends.
///
/// Oversized chunks are logged and skipped; any other read failure ends the
/// loop.
pub fn run_delivery<T, R>(executor: &CommandExecutor<T>, mut reader: ChunkReader<R>) -> DeliveryReport
where
    T: Transport,
    R: Read,
{
    let mut chunks = 0u64;
    loop {
        match reader.read_chunk() {
            Ok(chunk) => {
                executor.on_inbound_chunk(&chunk);
                chunks += 1;
            }
            Err(FrameError::ChunkTooLarge { size, max }) => {
                warn!(size, max, "oversized chunk dropped");
            }
            Err(FrameError::ConnectionClosed) => {
                info!(chunks, transport = executor.name(), "link closed; delivery stopped");
                return DeliveryReport { chunks, error: None };
            }
            Err(err) => {
                warn!(chunks, error = %err, "link read failed; delivery stopped");
                return DeliveryReport {
                    chunks,
                    error: Some(err),
                };
            }
        }
    }
}

impl<T: Transport + 'static> CommandExecutor<T> {
    /// Start a delivery thread over the transport's inbound stream.
    pub fn spawn_delivery(self: &Arc<Self>) -> Result<DeliveryHandle> {
        let reader = self.chunk_reader()?;
        let executor = Arc::clone(self);
        let thread = thread::Builder::new()
            .name("spikelink-delivery".to_string())
            .spawn(move || run_delivery(&executor, reader))
            .map_err(FrameError::Io)?;
        Ok(DeliveryHandle { thread })
    }
}

/// Async delivery over any `AsyncRead`, framed with
/// [`spikelink_frame::ChunkCodec`]. Returns when the reader reaches EOF.
#[cfg(feature = "async")]
pub async fn pump<T, R>(
    executor: &CommandExecutor<T>,
    reader: R,
    config: spikelink_frame::FrameConfig,
) -> DeliveryReport
where
    T: Transport,
    R: tokio::io::AsyncRead + Unpin,
{
    use std::pin::Pin;

    use futures_core::Stream;
    use spikelink_frame::ChunkCodec;
    use tokio_util::codec::FramedRead;

    let mut framed = FramedRead::new(reader, ChunkCodec::with_config(config));
    let mut chunks = 0u64;
    loop {
        let next = std::future::poll_fn(|cx| Pin::new(&mut framed).poll_next(cx)).await;
        match next {
            Some(Ok(chunk)) => {
                executor.on_inbound_chunk(&chunk);
                chunks += 1;
            }
            Some(Err(err)) => {
                warn!(chunks, error = %err, "async link read failed; delivery stopped");
                return DeliveryReport {
                    chunks,
                    error: Some(err),
                };
            }
            None => {
                info!(chunks, transport = executor.name(), "async link closed");
                return DeliveryReport { chunks, error: None };
            }
        }
    }
}
