use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: console output (compact or JSON) plus an
/// optional daily-rolling JSON log file.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let directive = if verbose { "debug" } else { logging.filter.as_str() };
    let env_filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log filter {:?}", directive))?;

    let console = if logging.json {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_writer(io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_target(verbose)
            .with_writer(io::stderr)
            .boxed()
    };

    let (file_layer, guard) = match &logging.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(env_filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(path) = &logging.file {
        tracing::debug!("📝 Logging to {}", path.display());
    }
    Ok(guard)
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log file path {} has no file name", path.display()))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
