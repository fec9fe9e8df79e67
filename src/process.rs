// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File helpers used while processing entries. Every failure is reported
//! as an `IOError` carrying the path involved.

use crate::{MerlinError, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Reads a UTF-8 text file.
pub fn read_content<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| MerlinError::io_error(path, e))
}

/// Writes `content` to `path`, creating missing parent directories.
pub fn write_content<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    create_parent_dirs(path)?;

    let mut file =
        File::create(path).map_err(|e| MerlinError::io_error(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| MerlinError::io_error(path, e))
}

/// Copies the bytes of `source` to `destination`, creating missing parent
/// directories. Returns the number of bytes copied.
pub fn copy_content<P, Q>(source: P, destination: Q) -> Result<u64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (source, destination) = (source.as_ref(), destination.as_ref());
    create_parent_dirs(destination)?;

    let mut input =
        File::open(source).map_err(|e| MerlinError::io_error(source, e))?;
    let mut output = File::create(destination)
        .map_err(|e| MerlinError::io_error(destination, e))?;
    let copied = io::copy(&mut input, &mut output)
        .map_err(|e| MerlinError::io_error(destination, e))?;
    output
        .flush()
        .map_err(|e| MerlinError::io_error(destination, e))?;
    Ok(copied)
}

fn create_parent_dirs(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)
                .map_err(|e| MerlinError::io_error(parent, e))
        }
        _ => Ok(()),
    }
}
