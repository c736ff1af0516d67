//! Log configuration for the CLI.
//!
//! All log output goes to stderr: `monitor` and `input-sink` stream
//! machine-readable data on stdout, and logs must never interleave with it.

use clap::{Args, ValueEnum};
use tracing::level_filters::LevelFilter;

/// Log flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct LogOptions {
    /// Log output format (stderr).
    #[arg(
        id = "log_format",
        long = "log-format",
        value_name = "FORMAT",
        default_value = "text",
        global = true
    )]
    pub format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "info",
        env = "FRAMELINK_LOG",
        global = true
    )]
    pub level: LogLevel,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl LogOptions {
    /// Install the global tracing subscriber.
    ///
    /// A second call is a no-op, which keeps in-process tests that drive
    /// command entry points from panicking.
    pub fn init(&self) {
        let builder = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(self.level.filter())
            .with_ansi(false)
            .with_target(false);

        match self.format {
            LogFormat::Text => {
                let _ = builder.try_init();
            }
            LogFormat::Json => {
                let _ = builder.json().try_init();
            }
        }
    }
}
