use std::time::Duration;

/// Errors that can occur in executor operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Transport-level error (open, write, close).
    #[error("transport error: {0}")]
    Transport(#[from] spikelink_transport::TransportError),

    /// Frame-level error on the inbound stream.
    #[error("frame error: {0}")]
    Frame(#[from] spikelink_frame::FrameError),

    /// No reply arrived for the call before its deadline.
    #[error("call {sequence} timed out after {after:?}")]
    Timeout { sequence: u64, after: Duration },

    /// A sequence number was registered twice. Indicates an allocator defect.
    #[error("sequence {0} is already pending")]
    DuplicateSequence(u64),

    /// Every event id up to `u32::MAX` is taken.
    #[error("event ids exhausted")]
    EventIdsExhausted,

    /// The reply slot was torn down without a value.
    #[error("call {0} abandoned before a reply arrived")]
    Abandoned(u64),
}

pub type Result<T> = std::result::Result<T, ExecError>;
