use std::sync::Arc;

use spikelink_exec::{CommandExecutor, DeliveryHandle, ExecutorConfig};
use spikelink_transport::Transport;

use crate::cmd::LinkArgs;
use crate::exit::{exec_error, CliResult};

/// An open hub link with its delivery thread running.
pub struct Link<T: Transport> {
    pub executor: Arc<CommandExecutor<T>>,
    pub delivery: DeliveryHandle,
    pub device: String,
}

#[cfg(unix)]
pub type DeviceTransport = spikelink_transport::StreamTransport<std::fs::File>;

#[cfg(unix)]
pub fn open(args: &LinkArgs, config: ExecutorConfig) -> CliResult<Link<DeviceTransport>> {
    use spikelink_transport::{tty_transport, TtyConfig};

    let transport = tty_transport(
        args.device.clone(),
        TtyConfig {
            baud_rate: args.baud,
        },
    );
    let executor = Arc::new(CommandExecutor::with_config(transport, config));
    executor
        .open()
        .map_err(|err| exec_error("open failed", err))?;
    let delivery = executor
        .spawn_delivery()
        .map_err(|err| exec_error("delivery failed to start", err))?;

    Ok(Link {
        device: executor.name().to_string(),
        executor,
        delivery,
    })
}

#[cfg(not(unix))]
pub type DeviceTransport = spikelink_transport::MemoryTransport;

#[cfg(not(unix))]
pub fn open(_args: &LinkArgs, _config: ExecutorConfig) -> CliResult<Link<DeviceTransport>> {
    Err(crate::exit::CliError::new(
        crate::exit::TRANSPORT_ERROR,
        "serial devices are only supported on unix",
    ))
}

impl<T: Transport> Link<T> {
    /// Close the transport. The delivery thread is left to exit with the
    /// process; a blocked TTY read does not wake on close.
    pub fn close(self) {
        if let Err(err) = self.executor.close() {
            tracing::debug!(error = %err, "close failed");
        }
    }
}
