// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build script that refuses to compile on toolchains older than the
//! `rust-version` declared in `Cargo.toml`.

use std::process;

/// The minimum supported Rust version.
const MIN_VERSION: &str = "1.75.0";

fn main() {
    match version_check::is_min_version(MIN_VERSION) {
        Some(true) => {}
        Some(false) => {
            eprintln!(
                "Merlin requires Rust {} or newer. Please update your toolchain.",
                MIN_VERSION
            );
            process::exit(1);
        }
        None => {
            eprintln!("Unable to determine the Rust compiler version.");
            process::exit(1);
        }
    }
}
