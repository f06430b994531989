use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use spikelink_exec::ExecutorConfig;

use crate::cmd::{link, WatchArgs};
use crate::exit::{exec_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let link = link::open(&args.link, ExecutorConfig::default())?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (tx, rx) = mpsc::channel::<String>();
    let subscription = link
        .executor
        .register_event_with(&args.method, move |payload| {
            let _ = tx.send(payload.to_string());
        })
        .map_err(|err| exec_error("event registration failed", err))?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(payload) => {
                print_event(subscription.id(), &args.method, &payload, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if link.delivery.is_finished() {
                    return Err(CliError::new(TRANSPORT_ERROR, "link closed while watching"));
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    link.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
