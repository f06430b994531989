/// Errors that can occur while reading chunks from the link.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A chunk grew past the configured maximum without a delimiter.
    /// The buffered bytes have been discarded.
    #[error("chunk too large ({size} bytes, max {max}) without delimiter")]
    ChunkTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached EOF. Any partial chunk is discarded.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
