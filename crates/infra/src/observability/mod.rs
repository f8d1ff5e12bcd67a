//! Logging setup
//!
//! Library code only emits `tracing` events. Binaries and tests that want to
//! see them call [`init_tracing`] once; later calls are no-ops.

use curlkit_domain::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber writing to stderr.
///
/// `RUST_LOG` wins over `config.filter`; an unparseable filter falls back to
/// `info`. Returns `false` when a subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Pretty => {
            registry.with(fmt::layer().pretty().with_writer(std::io::stderr)).try_init()
        }
        LogFormat::Compact => {
            registry.with(fmt::layer().compact().with_writer(std::io::stderr)).try_init()
        }
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_writer(std::io::stderr))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(format = %config.format, "tracing initialised");
    }
    installed.is_ok()
}
