pub mod config;
pub mod evaluate;
pub mod generate;
pub mod metrics;
pub mod models;
pub mod preview;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{ApiConfig, HttpConsoleApi};
use crate::cli::ApiArgs;

fn connect(args: &ApiArgs) -> Result<HttpConsoleApi> {
    let config = ApiConfig::resolve(args).context("failed to resolve api settings")?;
    debug!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "api client configured");
    HttpConsoleApi::new(config).context("failed to build http client")
}
