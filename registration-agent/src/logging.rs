use crate::config::Config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "info";

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins; otherwise `CC_IPR_LOG_LEVEL`, then `info`. An unparsable
/// level falls back to the default instead of aborting startup.
pub fn setup_logging(cfg: &Config) {
    let requested = cfg.log_level.as_deref().unwrap_or(DEFAULT_LEVEL);
    let (filter, rejected) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => match EnvFilter::try_new(requested) {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new(DEFAULT_LEVEL), Some(e)),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    if let Some(e) = rejected {
        warn!(level = requested, error = %e, "invalid CC_IPR_LOG_LEVEL, using {DEFAULT_LEVEL}");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "registration agent starting");
}
