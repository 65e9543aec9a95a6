//! File-backed tracing. The terminal belongs to the UI, so nothing is ever
//! written to stdout or stderr once the subscriber is installed.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "explorer.log";
const DEFAULT_FILTER: &str = "project_explorer=info,explorer=info";

/// Keeps the background writer alive; drop it last.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn log_dir() -> std::io::Result<PathBuf> {
    let preferred = dirs::data_local_dir()
        .map(|dir| dir.join("project_explorer").join("logs"))
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no data dir"));

    preferred
        .and_then(|dir| std::fs::create_dir_all(&dir).map(|_| dir))
        .or_else(|_| -> std::io::Result<PathBuf> {
            let dir = std::env::temp_dir().join("project_explorer").join("logs");
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        })
}

/// Install the global subscriber. `None` when no log directory can be made
/// or a subscriber is already installed.
pub fn init() -> Option<LoggingGuard> {
    let log_dir = log_dir().ok()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true),
    );

    if subscriber.try_init().is_err() {
        return None;
    }

    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(panic = %panic_info, "panic");
    }));

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Some(LoggingGuard { _guard: guard })
}
