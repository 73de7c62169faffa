// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Convert ML models into ESP32 firmware and flash them.
//!
//! Usage:
//!   sporenet init my-model
//!   sporenet build --model models/model.h5 --framework tensorflow --target esp32
//!   sporenet flash --port /dev/ttyUSB0
//!   sporenet monitor --port /dev/ttyUSB0

mod cli;
mod commands;
mod prompt;
mod resolve;
mod runner;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);
    cli::run(args)
}
