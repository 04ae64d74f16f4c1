//! Crowdcheck CLI entry point.

use anyhow::Context;
use clap::Parser;

use crowdcheck::cli::{handle_error, run, Cli};
use crowdcheck::infrastructure::config::ConfigLoader;
use crowdcheck::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    let config = match ConfigLoader::load().context("Failed to load configuration") {
        Ok(config) => config,
        Err(err) => handle_error(&err, json_mode),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(&err, json_mode),
    };

    if let Err(err) = run(cli, config).await {
        handle_error(&err, json_mode);
    }
}
