mod calendar;
mod cli;
mod config;
mod dates;
mod due_index;
mod ledger;
mod model;
mod role;
mod session;
mod stats;
mod storage;
mod sync;

use std::{io, process};

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;

fn main() {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("RIGCAL_LOG")
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();

    if let Err(e) = cli::run(cli, &config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
