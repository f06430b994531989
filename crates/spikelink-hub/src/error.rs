use spikelink_exec::ExecError;

/// Errors that can occur in hub device operations.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Executor-level error (transport, timeout).
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The hub answered with text that does not parse as the expected type.
    #[error("invalid reply to `{command}`: {reply:?}")]
    InvalidReply { command: String, reply: String },

    /// Not a port letter A-F.
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    /// Not one of left, right, center.
    #[error("invalid button: {0:?}")]
    InvalidButton(String),
}

impl HubError {
    /// Whether the underlying call ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HubError::Exec(ExecError::Timeout { .. }))
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
