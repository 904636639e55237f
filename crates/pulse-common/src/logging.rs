//! ---
//! pulse_section: "01-core-functionality"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Tracing initialisation for Pulse services and tools."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "PULSE_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Console format; the rolling file is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Flushes buffered log lines when dropped. Hold it until the process exits.
#[must_use = "dropping the guard stops log delivery"]
#[derive(Debug)]
pub struct TracingGuard {
    log_file: PathBuf,
    _console: WorkerGuard,
    _file: WorkerGuard,
}

impl TracingGuard {
    /// Path of the rolling log file, without the date suffix.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Pick the first directive that parses: `primary` (`PULSE_LOG`), then
/// `fallback` (`RUST_LOG`), then `info`.
fn build_filter(primary: Option<String>, fallback: Option<String>) -> EnvFilter {
    [primary, fallback]
        .into_iter()
        .flatten()
        .find_map(|directive| match EnvFilter::try_new(&directive) {
            Ok(filter) => Some(filter),
            Err(err) => {
                eprintln!("ignoring invalid log directive {directive:?}: {err}");
                None
            }
        })
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the process-wide subscriber: console on stderr in `config.format`,
/// plus a daily rolling JSON file under `config.directory`.
///
/// Stdout is never used, so command output stays machine readable. If a
/// subscriber is already installed the existing one is kept.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<TracingGuard> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "unable to create log directory {}",
            config.directory.display()
        )
    })?;
    let file_name = format!(
        "{}.log",
        config.file_prefix.as_deref().unwrap_or(service_name)
    );
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, &file_name));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(console_writer)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer)
        .boxed();

    let filter = build_filter(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    let log_file = config.directory.join(file_name);
    info!(service = %service_name, log_file = %log_file.display(), installed, "tracing initialised");
    Ok(TracingGuard {
        log_file,
        _console: console_guard,
        _file: file_guard,
    })
}
