use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod exec;
pub mod init;
pub mod link;
pub mod parse;
pub mod send;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a command on the hub and print its reply.
    Exec(ExecArgs),
    /// Send a raw REPL line without waiting for a reply.
    Send(SendArgs),
    /// Register an event source and print each notification.
    Watch(WatchArgs),
    /// Run the hub setup sequence (imports, devices, evaluator).
    Init(InitArgs),
    /// Classify an inbound chunk offline.
    Parse(ParseArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Exec(args) => exec::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Watch(args) => watch::run(args, format),
        Command::Init(args) => init::run(args, format),
        Command::Parse(args) => parse::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device of the hub.
    #[arg(long, short = 'd', env = "SPIKELINK_DEVICE")]
    pub device: PathBuf,
    /// Line speed in baud.
    #[arg(long, env = "SPIKELINK_BAUD", default_value_t = 115_200)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Expression to evaluate on the hub.
    pub command: String,
    /// Maximum time to wait for the reply (e.g. 3s, 500ms).
    #[arg(long, env = "SPIKELINK_TIMEOUT", default_value = "3s")]
    pub timeout: String,
    /// Define the remote evaluator helper before the call.
    #[arg(long)]
    pub define_evaluator: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Line to send verbatim.
    pub command: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Remote callable taking a one-argument callback, e.g.
    /// hub.button.left.callback.
    pub method: String,
    /// Exit after receiving N notifications.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Motor ports (comma-separated).
    #[arg(long, value_delimiter = ',', default_values = ["A", "B", "E", "F"])]
    pub motors: Vec<String>,
    /// Color sensor port.
    #[arg(long, default_value = "C", conflicts_with = "no_color_sensor")]
    pub color_sensor: String,
    /// Distance sensor port.
    #[arg(long, default_value = "D", conflicts_with = "no_distance_sensor")]
    pub distance_sensor: String,
    /// Skip color sensor setup.
    #[arg(long)]
    pub no_color_sensor: bool,
    /// Skip distance sensor setup.
    #[arg(long)]
    pub no_distance_sensor: bool,
    /// Text to show on the display once initialized.
    #[arg(long)]
    pub text: Option<String>,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Chunk as received, delimiter included (e.g. '!RC:0:50%').
    pub chunk: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
