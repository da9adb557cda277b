use anyhow::Result;

mod config;
mod logging;
mod platform;
mod runner;
mod status;

use runner::Runner;

/// Loads configuration, initialises logging, and keeps the platform registered.
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::Config::from_env()?;
    logging::setup_logging(&cfg);
    cfg.info();

    let runner = Runner::builder(cfg).build_client()?.build()?;

    runner.run().await
}
