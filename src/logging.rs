//! Log output setup
//!
//! Configuration is read before its `log_level` is known, so `main` runs that
//! step under [`startup_subscriber`] and installs the configured level after.

use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::FmtSubscriber;

/// Level used until the configuration has been read
pub const STARTUP_LEVEL: Level = Level::INFO;

pub fn subscriber<W>(level: Level, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(writer)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish()
}

/// Scoped subscriber for the steps that run before [`install`]
pub fn startup_subscriber() -> impl Subscriber + Send + Sync {
    subscriber(STARTUP_LEVEL, std::io::stderr)
}

/// Installs the process-wide subscriber at `level`, writing to stderr.
pub fn install(level: Level) -> Result<(), SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(subscriber(level, std::io::stderr))
}
