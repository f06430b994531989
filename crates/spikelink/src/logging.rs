use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::{ParseError, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Crates that follow `--log-level`. Anything else is capped at warn.
const LINK_TARGETS: [&str; 5] = [
    "spikelink",
    "spikelink_transport",
    "spikelink_frame",
    "spikelink_exec",
    "spikelink_hub",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `level` for the link crates, at most warn for dependencies.
pub fn link_targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    LINK_TARGETS.iter().fold(
        Targets::new().with_default(level.min(LevelFilter::WARN)),
        |targets, target| targets.with_target(*target, level),
    )
}

/// Parse per-crate directives such as `spikelink_exec=debug,warn`.
pub fn parse_log_filter(directives: &str) -> Result<Targets, String> {
    directives
        .parse()
        .map_err(|err: ParseError| format!("invalid log filter: {err}"))
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
///
/// An explicit `filter` replaces the per-crate defaults derived from `level`.
pub fn init_logging(format: LogFormat, level: LogLevel, filter: Option<Targets>) {
    let targets = filter.unwrap_or_else(|| link_targets(level));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true);
    let layer = match format {
        LogFormat::Text => layer.with_target(false).boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(targets)
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn link_crates_follow_requested_level() {
        let targets = link_targets(LogLevel::Debug);
        assert!(targets.would_enable("spikelink_exec::executor", &Level::DEBUG));
        assert!(targets.would_enable("spikelink::cmd::watch", &Level::DEBUG));
        assert!(!targets.would_enable("spikelink_frame::reader", &Level::TRACE));
    }

    #[test]
    fn dependencies_are_capped_at_warn() {
        let targets = link_targets(LogLevel::Trace);
        assert!(targets.would_enable("tokio_util::codec", &Level::WARN));
        assert!(!targets.would_enable("tokio_util::codec", &Level::INFO));

        let quiet = link_targets(LogLevel::Error);
        assert!(!quiet.would_enable("tokio_util::codec", &Level::WARN));
        assert!(!quiet.would_enable("spikelink_hub::session", &Level::WARN));
    }

    #[test]
    fn explicit_filter_parses_per_crate_directives() {
        let targets = parse_log_filter("spikelink_frame=trace,error").unwrap();
        assert!(targets.would_enable("spikelink_frame::codec", &Level::TRACE));
        assert!(!targets.would_enable("spikelink_exec::pending", &Level::WARN));

        let err = parse_log_filter("spikelink_exec=loud").unwrap_err();
        assert!(err.starts_with("invalid log filter"));
    }
}
