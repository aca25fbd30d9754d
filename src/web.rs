#![cfg(not(tarpaulin_include))]

use catalog_admin::app;
use catalog_admin::config::AdminConfig;
use clap::Parser;

/// Main entry point for the admin web front
///
/// Reads the listen address and catalog API location from flags or the
/// environment (see `--help`), then serves the category screen until the
/// process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AdminConfig::parse();
    app::run(config).await
}
