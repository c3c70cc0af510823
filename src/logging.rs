use configuration::{LogLevel, Logging};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber.
///
/// Level precedence: `--log-level`, then `RUST_LOG`, then `logging.level`.
/// Logs go to stderr so table output on stdout stays clean. When a log
/// directory is configured a daily rolling file is written as well; the
/// returned guard must be held until exit so buffered lines are flushed.
pub fn init_tracing(
    logging: &Logging,
    level_override: Option<LogLevel>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match level_override {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str())),
    };
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "folio.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()?;
            Ok(None)
        }
    }
}
