//! Initialize a hub, show a face, and poll the distance sensor.
//!
//! Run with:
//!   cargo run --example hub-demo -- /dev/ttyACM0
//!
//! Press the hub's left button to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use spikelink::exec::CommandExecutor;
use spikelink::hub::{ButtonId, HubSession};

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use spikelink::transport::{tty_transport, TtyConfig};

    let device = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyACM0".to_string());

    let executor = Arc::new(CommandExecutor::new(tty_transport(
        device.clone(),
        TtyConfig::default(),
    )));
    executor.open()?;
    let _delivery = executor.spawn_delivery()?;
    eprintln!("Connected to {device}");

    let mut hub = HubSession::new(Arc::clone(&executor));
    hub.initialize()?;
    hub.display_image("hub.Image.HAPPY")?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    hub.button(ButtonId::Left).on_change(move |_| {
        flag.store(true, Ordering::SeqCst);
    })?;

    let sensor = hub
        .distance_sensor()
        .ok_or("distance sensor not configured")?;
    while !stop.load(Ordering::SeqCst) {
        match sensor.distance_cm() {
            Ok(cm) => eprintln!("distance: {cm} cm"),
            Err(e) => eprintln!("read failed: {e}"),
        }
        thread::sleep(Duration::from_millis(500));
    }

    hub.display_text("bye")?;
    eprintln!("{}", summary(&executor));
    executor.close()?;
    Ok(())
}

#[cfg(unix)]
fn summary<T: spikelink::transport::Transport>(executor: &CommandExecutor<T>) -> String {
    let stats = executor.stats();
    format!(
        "calls: {} resolved, {} timed out; events: {} dispatched",
        stats.calls.resolved, stats.calls.timed_out, stats.events.dispatched
    )
}

#[cfg(not(unix))]
fn main() {
    eprintln!("hub-demo needs a unix serial device");
}
