use spikelink_exec::ExecutorConfig;
use tracing::info;

use crate::cmd::{link, SendArgs};
use crate::exit::{exec_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let link = link::open(&args.link, ExecutorConfig::default())?;
    link.executor
        .execute_fire_and_forget(&args.command)
        .map_err(|err| exec_error("send failed", err))?;
    info!(device = %link.device, bytes = args.command.len(), "line sent");
    link.close();
    Ok(SUCCESS)
}
