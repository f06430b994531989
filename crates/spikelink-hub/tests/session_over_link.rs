#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use spikelink_exec::CommandExecutor;
use spikelink_hub::{ButtonId, HubSession, Port};
use spikelink_transport::StreamTransport;

/// Minimal hub REPL: echoes every line, answers evaluator calls from a
/// fixed table, and fires button events after a callback is installed.
fn fake_hub(stream: UnixStream) -> thread::JoinHandle<Vec<String>> {
    thread::spawn(move || {
        let mut out = stream.try_clone().unwrap();
        let mut seen = Vec::new();
        for line in BufReader::new(stream).split(b'\n') {
            let Ok(line) = line else { break };
            let line = String::from_utf8_lossy(&line).trim_end().to_string();
            out.write_all(line.as_bytes()).unwrap();
            out.write_all(b"\r\n").unwrap();

            if let Some(rest) = line.strip_prefix("evaluator(\"RC\", ") {
                let (seq, command) = rest.split_once(", ").unwrap();
                let reply = match command {
                    "\"distance_sensor.get_distance_cm()\")" => "None",
                    "\"motorA.get_position()\")" => "90",
                    "\"color_sensor.get_color()\")" => "'green'",
                    _ => "0",
                };
                write!(out, "'!RC:{seq}:{reply}%'\r\n>>> ").unwrap();
            } else if line.starts_with("hub.button.center.callback(") {
                let id = line.split("CB:").nth(1).unwrap().split(':').next().unwrap();
                write!(out, "CB:{id}:0%\r\nCB:{id}:420%\r\n").unwrap();
            }
            seen.push(line);
        }
        seen
    })
}

#[test]
fn initialize_and_read_devices_over_a_socket() {
    let (host, device) = UnixStream::pair().unwrap();
    let hub = fake_hub(device);

    let exec = Arc::new(CommandExecutor::new(StreamTransport::from_stream(
        "spike", host,
    )));
    let delivery = exec.spawn_delivery().unwrap();

    let mut session = HubSession::new(Arc::clone(&exec));
    session.initialize().unwrap();

    let distance = session.distance_sensor().unwrap().distance_cm().unwrap();
    assert_eq!(distance, 0);
    assert_eq!(session.motor(Port::A).unwrap().position().unwrap(), 90);
    assert_eq!(
        session.color_sensor().unwrap().color().unwrap().as_deref(),
        Some("green")
    );

    let (tx, rx) = mpsc::channel();
    let tx = std::sync::Mutex::new(tx);
    session
        .button(ButtonId::Center)
        .on_change(move |ms| {
            let _ = tx.lock().unwrap().send(ms);
        })
        .unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 0);
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 420);

    exec.close().unwrap();
    let report = delivery.join();
    assert!(report.error.is_none());

    let lines = hub.join().unwrap();
    assert_eq!(lines[0], "\u{3}");
    assert!(lines.contains(&"primeHub = PrimeHub()".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("def evaluator(")));
    assert_eq!(exec.pending_calls(), 0);
}
