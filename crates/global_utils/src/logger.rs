use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the non-blocking log writer alive; dropping it flushes buffered records.
pub struct LoggerGuard {
    _guard: WorkerGuard,
}

/// Installs the process-wide tracing subscriber.
///
/// Filtering comes from `RUST_LOG` and defaults to `info`. The returned guard
/// must be held for the lifetime of the process (bind it in `main`).
pub fn init_logger() -> LoggerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_target(true))
        .init();

    LoggerGuard { _guard: guard }
}
