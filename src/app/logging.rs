use anyhow::anyhow;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `RUST_LOG` wins when set and valid; otherwise `fallback` is used, and
/// finally `info`.
pub fn build_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Installs the stderr fmt subscriber. Stdout stays free for report output.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(layer)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}
