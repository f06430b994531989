use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use spikelink_exec::ExecutorStats;
use spikelink_frame::ParsedMessage;
use spikelink_hub::HubConfig;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    kind: &'static str,
    device: &'a str,
    command: &'a str,
    reply: &'a str,
    elapsed_ms: u128,
}

pub fn print_reply(device: &str, command: &str, reply: &str, elapsed_ms: u128, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ReplyOutput {
            kind: "reply",
            device,
            command,
            reply,
            elapsed_ms,
        }),
        OutputFormat::Table => print_table(
            &["DEVICE", "COMMAND", "REPLY", "ELAPSED"],
            vec![vec![
                device.to_string(),
                command.to_string(),
                reply.to_string(),
                format!("{elapsed_ms}ms"),
            ]],
        ),
        OutputFormat::Pretty => {
            println!("device={device} command={command} reply={reply} elapsed={elapsed_ms}ms");
        }
        OutputFormat::Raw => print_raw_line(reply),
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    kind: &'static str,
    id: u32,
    method: &'a str,
    payload: &'a str,
    timestamp: String,
}

pub fn print_event(id: u32, method: &str, payload: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EventOutput {
            kind: "event",
            id,
            method,
            payload,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => print_table(
            &["ID", "METHOD", "PAYLOAD"],
            vec![vec![id.to_string(), method.to_string(), payload.to_string()]],
        ),
        OutputFormat::Pretty => println!("event id={id} method={method} payload={payload}"),
        OutputFormat::Raw => print_raw_line(payload),
    }
}

#[derive(Serialize)]
struct ParsedOutput<'a> {
    kind: &'static str,
    chunk: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<&'a str>,
}

pub fn print_parsed(chunk: &str, message: &ParsedMessage, format: OutputFormat) {
    let result = message.result();
    let event = message.event();
    match format {
        OutputFormat::Json => print_json(&ParsedOutput {
            kind: message.kind(),
            chunk,
            sequence: result.map(|r| r.sequence),
            result: result.map(|r| r.payload.as_str()),
            event_id: event.map(|e| e.id),
            event: event.map(|e| e.payload.as_str()),
        }),
        OutputFormat::Table => {
            let mut rows = Vec::new();
            if let Some(r) = result {
                rows.push(vec!["result".to_string(), r.sequence.to_string(), r.payload.clone()]);
            }
            if let Some(e) = event {
                rows.push(vec!["event".to_string(), e.id.to_string(), e.payload.clone()]);
            }
            if rows.is_empty() {
                rows.push(vec!["unrecognized".to_string(), "-".to_string(), chunk.to_string()]);
            }
            print_table(&["KIND", "ID", "PAYLOAD"], rows);
        }
        OutputFormat::Pretty => {
            print!("kind={}", message.kind());
            if let Some(r) = result {
                print!(" sequence={} result={}", r.sequence, r.payload);
            }
            if let Some(e) = event {
                print!(" event_id={} event={}", e.id, e.payload);
            }
            println!();
        }
        OutputFormat::Raw => {
            if let Some(r) = result {
                print_raw_line(&r.payload);
            }
            if let Some(e) = event {
                print_raw_line(&e.payload);
            }
        }
    }
}

#[derive(Serialize)]
struct InitOutput<'a> {
    kind: &'static str,
    device: &'a str,
    config: &'a HubConfig,
    stats: &'a ExecutorStats,
}

pub fn print_init(device: &str, config: &HubConfig, stats: &ExecutorStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&InitOutput {
            kind: "init",
            device,
            config,
            stats,
        }),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            let motors = config
                .motors
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let port = |p: Option<spikelink_hub::Port>| p.map_or("-".to_string(), |p| p.to_string());
            if matches!(format, OutputFormat::Table) {
                print_table(
                    &["DEVICE", "MOTORS", "COLOR", "DISTANCE"],
                    vec![vec![
                        device.to_string(),
                        motors,
                        port(config.color_sensor_port),
                        port(config.distance_sensor_port),
                    ]],
                );
            } else {
                println!(
                    "initialized device={device} motors={motors} color={} distance={}",
                    port(config.color_sensor_port),
                    port(config.distance_sensor_port)
                );
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

fn print_raw_line(text: &str) {
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
