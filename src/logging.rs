// Logging setup: a log file in the data directory plus console output.
//
// Set `DEBUG_LOGGING=1` to see per-step resolution detail, or `RUST_LOG`
// for a custom filter.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const LOG_FILE_NAME: &str = "wordvoice.log";

fn filter(debug_logging: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if debug_logging {
        EnvFilter::new("info,wordvoice_lib=debug")
    } else {
        EnvFilter::new("warn,wordvoice_lib=info")
    }
}

/// Initialize file + stderr logging.
///
/// The returned guard flushes the file writer on drop and must be held until
/// exit. Returns `None` (stderr only) when the log directory can't be created.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    if let Err(e) = std::fs::create_dir_all(log_dir) {
        // Subscriber isn't installed yet
        eprintln!(
            "Failed to create log directory {:?}: {}, logging to stderr only",
            log_dir, e
        );
        init_stderr_only(debug_logging);
        return None;
    }

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(filter(debug_logging))
        .init();

    tracing::debug!(
        log_file = ?log_dir.join(LOG_FILE_NAME),
        debug_logging,
        "Logging initialized"
    );

    Some(guard)
}

fn init_stderr_only(debug_logging: bool) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_span_events(FmtSpan::NONE),
        )
        .with(filter(debug_logging))
        .init();
}
