//! `quizgraph` entry point.
//!
//! # Responsibility
//! - Load `.env`, resolve configuration and start logging before any
//!   storage is touched.

mod cli;

use anyhow::{anyhow, Result};
use clap::Parser;
use log::error;
use quizgraph_core::{init_logging, init_stderr_logging, AppConfig};

fn main() -> Result<()> {
    // A missing .env file is normal; the process environment still applies.
    let _ = dotenv::dotenv();

    let cli = cli::Cli::parse();
    let config = AppConfig::from_env()?;
    let logging = match &config.log_dir {
        Some(dir) => init_logging(config.log_level, &dir.to_string_lossy()),
        None => init_stderr_logging(config.log_level),
    };
    logging.map_err(|message| anyhow!("failed to initialize logging: {message}"))?;

    cli.run(&config).inspect_err(|err| {
        error!("event=cli_command module=cli status=error error={err:#}");
    })
}
