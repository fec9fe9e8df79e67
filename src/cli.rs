// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line interface for Merlin
//!
//! Parses arguments, assembles the [`Config`] from the configuration file,
//! the environment and the command-line flags, and runs the build.
//!
//! # Examples
//!
//! ```
//! use merlin::cli;
//! use std::path::PathBuf;
//!
//! let matches = cli::build().get_matches_from(vec![
//!     "merlin",
//!     "build",
//!     "--source",
//!     "site",
//!     "--keep-going",
//! ]);
//!
//! assert_eq!(
//!     matches.get_one::<PathBuf>("source").unwrap(),
//!     &PathBuf::from("site")
//! );
//! assert!(matches.get_flag("keep-going"));
//! ```

use crate::core::config::{
    Config, ConfigBuilder, DEFAULT_CONFIG_FILE, ENV_PREFIX,
};
use crate::site::{BuildReport, SiteBuilder};
use crate::{MerlinError, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::debug;
use std::path::PathBuf;

/// The current version of Merlin, as defined in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the Merlin command-line interface.
///
/// Every option is global, so it may be given before or after the
/// optional `build` subcommand. Without a subcommand the site is built.
pub fn build() -> Command {
    Command::new("merlin")
        .author("Merlin Contributors")
        .about("Builds a static site from markdown pages and HTML files.")
        .version(VERSION)
        .arg(
            Arg::new("conf")
                .short('c')
                .long("conf")
                .global(true)
                .help(format!(
                    "Configuration file [default: {} if present]",
                    DEFAULT_CONFIG_FILE
                ))
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .global(true)
                .help("Source directory")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .help("Output directory, relative to the source directory")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("keep-going")
                .short('k')
                .long("keep-going")
                .global(true)
                .help("Keep building after a file fails")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Increase logging (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
        .subcommand(Command::new("build").about("Build the site (default)"))
        .after_help(
            "\x1b[1;4mLicense:\x1b[0m\n  The project is licensed under the terms of \
             both the MIT license and the Apache License (Version 2.0).",
        )
}

/// Number of `-v` flags given.
pub fn verbosity(matches: &ArgMatches) -> u8 {
    matches.get_count("verbose")
}

/// Assembles the configuration for a parsed command line.
///
/// Precedence, lowest first: defaults, the configuration file, `MERLIN_`
/// environment variables, command-line flags. An explicit `--conf` file
/// must exist; the default one is optional.
pub fn load_config(matches: &ArgMatches) -> Result<Config> {
    let mut builder = match matches.get_one::<PathBuf>("conf") {
        Some(path) => ConfigBuilder::new().with_file(path),
        None => ConfigBuilder::new().with_optional_file(DEFAULT_CONFIG_FILE),
    }
    .with_env_prefix(ENV_PREFIX);

    if let Some(source) = matches.get_one::<PathBuf>("source") {
        builder = builder
            .with_override("source_dir", source.to_string_lossy().into_owned());
    }
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        builder = builder
            .with_override("output_dir", output.to_string_lossy().into_owned());
    }
    if matches.get_flag("keep-going") {
        builder = builder.with_override("build.fail_fast", false);
    }

    builder.build()
}

/// Runs the command described by `matches`.
///
/// Returns the build report. A report with failures is still `Ok`; the
/// caller decides how to surface it.
pub fn run(matches: &ArgMatches) -> Result<BuildReport> {
    match matches.subcommand() {
        Some(("build", _)) | None => {
            let config = load_config(matches)?;
            debug!("Resolved configuration: {:?}", config);
            SiteBuilder::new(&config)?.build()
        }
        Some((name, _)) => Err(MerlinError::config_error(
            format!("Unknown command: {}", name),
            None,
        )),
    }
}
