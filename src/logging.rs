use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console and rolling-file logging.
///
/// The returned guard flushes the file writer when dropped, so the caller keeps
/// it alive for as long as the process runs.
pub fn init_logging(log_dir: &Path) -> WorkerGuard {
    let _ = fs::create_dir_all(log_dir);

    // Daily rotation: logs/catalog_etl.log.YYYY-MM-DD
    let file_appender = tracing_appender::rolling::daily(log_dir, "catalog_etl.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(non_blocking_writer);

    // Console goes to stderr so `normalize` can stream JSON lines on stdout
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_etl=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
