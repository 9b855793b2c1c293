use color_eyre::Result;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

/// Environment variable holding the log filter, e.g. `debug` or `crafty_exporter=trace,reqwest=info`.
pub const LOG_LEVEL_ENV: &str = "LOGLEVEL";

const DEFAULT_FILTER: &str = "info";

pub fn init_errors() -> Result<()> {
    color_eyre::install()
}

pub fn init_logging() -> Result<()> {
    let filter = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .map(|value| normalize_filter(&value))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(EnvFilter::try_new(&filter)?))
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;

    Ok(())
}

/// Accepts the level names used by other logging setups (`WARNING`, `CRITICAL`) on top of tracing's own.
fn normalize_filter(value: &str) -> String {
    match value.trim().to_ascii_lowercase().as_str() {
        "" => DEFAULT_FILTER.to_string(),
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        _ => value.trim().to_string(),
    }
}
