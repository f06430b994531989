use std::time::Duration;

use spikelink_frame::FrameConfig;

/// Deadline for a synchronous call when none is given.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for a [`crate::CommandExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deadline applied by `execute_sync`. Default: 3 s.
    pub call_timeout: Duration,
    /// Framing limits for the inbound reader.
    pub frame: FrameConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            frame: FrameConfig::default(),
        }
    }
}
