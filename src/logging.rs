use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,finance_dashboard=debug";
const LOG_FILE: &str = "finance-dashboard.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stdout. Used by `server` mode where nothing else owns the terminal.
pub fn init_stdout() {
    let stdout_layer = fmt::layer().with_target(true).compact();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .init();

    tracing::debug!("Tracing initialized (stdout)");
}

/// Log to `<dir>/finance-dashboard.log`. The TUI draws on the terminal, so
/// its diagnostics go to a file instead. Keep the guard alive until exit.
pub fn init_file(dir: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .init();

    tracing::debug!(dir = %dir.display(), "Tracing initialized (file)");
    guard
}
