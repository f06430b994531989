use std::time::Instant;

use spikelink_exec::ExecutorConfig;
use spikelink_frame::EVALUATOR_DEFINITION;

use crate::cmd::{link, parse_duration, ExecArgs};
use crate::exit::{exec_error, CliResult, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: ExecArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let config = ExecutorConfig {
        call_timeout: timeout,
        ..ExecutorConfig::default()
    };
    let link = link::open(&args.link, config)?;

    if args.define_evaluator {
        link.executor
            .execute_fire_and_forget(EVALUATOR_DEFINITION)
            .map_err(|err| exec_error("evaluator definition failed", err))?;
    }

    let started = Instant::now();
    let reply = link
        .executor
        .execute_sync(&args.command)
        .map_err(|err| exec_error("call failed", err))?;
    print_reply(
        &link.device,
        &args.command,
        &reply,
        started.elapsed().as_millis(),
        format,
    );

    link.close();
    Ok(SUCCESS)
}
