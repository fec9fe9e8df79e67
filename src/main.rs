// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Merlin CLI
//!
//! Entry point of the `merlin` binary. Initialises the logger from the
//! verbosity flags, runs the build and turns failures into a non-zero
//! exit status.

use anyhow::{bail, Context};
use env_logger::{Builder, Env};
use log::info;
use merlin::cli;

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run() -> anyhow::Result<()> {
    let matches = cli::build().get_matches();
    init_logger(cli::verbosity(&matches));

    let report = cli::run(&matches).context("Build failed")?;

    let failed = report.failures().count();
    if failed > 0 {
        bail!(
            "{} of {} files failed to build",
            failed,
            report.outcomes.len()
        );
    }

    info!("Wrote {} files", report.written());
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
