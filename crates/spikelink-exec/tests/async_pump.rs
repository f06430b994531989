#![cfg(feature = "async")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use spikelink_exec::{pump, CommandExecutor};
use spikelink_frame::FrameConfig;
use spikelink_transport::MemoryTransport;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn pump_dispatches_events_until_eof() {
    let (transport, _tap) = MemoryTransport::new();
    let exec = CommandExecutor::new(transport);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    exec.register_event_with("distance.on_change", move |p| {
        sink.lock().unwrap().push(p.to_string())
    })
    .unwrap();

    let (mut hub, host) = tokio::io::duplex(256);
    hub.write_all(b"CB:1:12%CB:1:9%noise%").await.unwrap();
    drop(hub);

    let report = pump(&exec, host, FrameConfig::default()).await;
    assert!(report.error.is_none());
    assert_eq!(report.chunks, 3);
    assert_eq!(*seen.lock().unwrap(), vec!["12", "9"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pump_resolves_blocking_caller() {
    let (transport, tap) = MemoryTransport::new();
    let exec = Arc::new(CommandExecutor::new(transport));

    let caller = {
        let exec = Arc::clone(&exec);
        std::thread::spawn(move || exec.execute_sync_with_timeout("motorA.get_position()", Duration::from_secs(2)))
    };
    while tap.write_count() == 0 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let (mut hub, host) = tokio::io::duplex(256);
    let pumping = {
        let exec = Arc::clone(&exec);
        tokio::spawn(async move { pump(&exec, host, FrameConfig::default()).await })
    };
    hub.write_all(b"!RC:0:180%").await.unwrap();

    let reply = tokio::task::spawn_blocking(move || caller.join().unwrap())
        .await
        .unwrap();
    assert_eq!(reply.unwrap(), "180");

    drop(hub);
    let report = pumping.await.unwrap();
    assert_eq!(report.chunks, 1);
    assert_eq!(exec.pending_calls(), 0);
}
