//! Tracing setup: stdout plus an optional rotating operation log.

use crate::error::Result;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "probation_bot=info,probation_core=info";

/// Daily files kept on disk: four weeks of history.
pub const MAX_LOG_FILES: usize = 28;

/// Build the rotating appender for `path`.
///
/// `logs/qobot.log` becomes `logs/qobot.<date>.log`, rolled daily with the
/// oldest files pruned past [`MAX_LOG_FILES`].
pub fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let prefix = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "qobot".to_string());

    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(MAX_LOG_FILES);
    if let Some(ext) = path.extension() {
        builder = builder.filename_suffix(ext.to_string_lossy().into_owned());
    }

    Ok(builder.build(dir)?)
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender(path)?),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}
