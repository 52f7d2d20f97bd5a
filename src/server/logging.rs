//! Tracing subscriber setup from configuration.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};

use thiserror::Error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::config::{LogFormat, LoggingConfig};

/// Install the global tracing subscriber described by `config`.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;
    let (writer, terminal) = make_writer(&config.output)?;
    let ansi = config.color && terminal;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match (config.format, config.timestamps) {
        (LogFormat::Text, true) => registry
            .with(
                fmt::layer()
                    .with_ansi(ansi)
                    .with_target(config.target)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(writer),
            )
            .try_init(),
        (LogFormat::Text, false) => registry
            .with(
                fmt::layer()
                    .with_ansi(ansi)
                    .with_target(config.target)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(writer)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Json, true) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.target)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(writer),
            )
            .try_init(),
        (LogFormat::Json, false) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.target)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(writer)
                    .without_time(),
            )
            .try_init(),
    };
    installed.map_err(|e| LoggingError::Install(e.to_string()))
}

/// Writer for an output setting, and whether it is a terminal.
fn make_writer(output: &str) -> Result<(BoxMakeWriter, bool), LoggingError> {
    match output {
        "stdout" => Ok((BoxMakeWriter::new(io::stdout), io::stdout().is_terminal())),
        "stderr" => Ok((BoxMakeWriter::new(io::stderr), io::stderr().is_terminal())),
        path => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| LoggingError::FileOpen(path.to_string(), e))?;
            Ok((BoxMakeWriter::new(file), false))
        }
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("Failed to open log file '{0}': {1}")]
    FileOpen(String, io::Error),
    #[error("Failed to install subscriber: {0}")]
    Install(String),
}
