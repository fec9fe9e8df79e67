// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Error Handling for Merlin
//!
//! This module defines the error type shared by every stage of the build
//! pipeline. The `thiserror` crate is used to derive `Display` and
//! `Error` so that each stage only has to pick the right variant.
//!
//! Errors fall in two groups. Directory-level failures (`FatalIOError`,
//! `ConfigError`) always stop a build. Per-file failures are wrapped in
//! `EntryError` by the site builder, which decides whether they abort the
//! run or are recorded on the file's outcome.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A unified result type for the Merlin library.
pub type Result<T> = std::result::Result<T, MerlinError>;

/// Boxed source error carried by several variants.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for Merlin.
#[derive(Error, Debug)]
pub enum MerlinError {
    /// Error related to loading or validating the configuration.
    #[error("Configuration error: {message}.")]
    ConfigError {
        /// Detailed description of the configuration error.
        message: String,
        /// Optional path of the configuration file or directory involved.
        path: Option<PathBuf>,
    },

    /// A directory-level failure that aborts the whole build: the output
    /// directory cannot be cleared or created, or the source tree cannot
    /// be read.
    #[error("Fatal IO error: {message} at `{}`: {source}", .path.display())]
    FatalIOError {
        /// What the builder was doing.
        message: String,
        /// Directory associated with the error.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// IO error encountered while reading or writing a single file.
    #[error("File IO error at `{}`: {source}", .path.display())]
    IOError {
        /// Path associated with the IO error.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The frontmatter block of a content file is malformed.
    #[error("Metadata parse error: {message}.")]
    MetadataParseError {
        /// Description of the problem.
        message: String,
        /// The YAML error, when there is one.
        #[source]
        source: Option<BoxedSource>,
    },

    /// A recognised frontmatter field holds a value of the wrong type.
    #[error(
        "Invalid frontmatter field `{field}`: expected {expected}, found {found}."
    )]
    InvalidFrontmatterFieldError {
        /// Name of the offending field.
        field: String,
        /// The type the field must have.
        expected: &'static str,
        /// The type that was found.
        found: &'static str,
    },

    /// No template file matches the requested name.
    #[error(
        "Template `{template}` not found in `{}`.",
        .layout_dir.display()
    )]
    TemplateNotFoundError {
        /// The requested template name.
        template: String,
        /// The layout directory the engine is bound to.
        layout_dir: PathBuf,
    },

    /// A template failed to compile or render.
    #[error(
        "Template rendering error: {message} in template `{template}`."
    )]
    TemplateRenderingError {
        /// Description of the template rendering error.
        message: String,
        /// The template associated with the error.
        template: String,
        /// Optional source error providing additional context.
        #[source]
        source: Option<BoxedSource>,
    },

    /// A per-file failure, annotated with the file's relative path.
    #[error("Failed to build `{}`: {source}", .path.display())]
    EntryError {
        /// Relative path of the file that failed.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: Box<MerlinError>,
    },
}

impl From<std::io::Error> for MerlinError {
    /// Converts a standard IO error into a `MerlinError::IOError` with an
    /// empty path.
    fn from(source: std::io::Error) -> Self {
        MerlinError::IOError {
            path: PathBuf::new(),
            source,
        }
    }
}

impl MerlinError {
    /// Creates a `ConfigError` with a specific message.
    pub fn config_error<S: Into<String>>(
        message: S,
        path: Option<PathBuf>,
    ) -> Self {
        MerlinError::ConfigError {
            message: message.into(),
            path,
        }
    }

    /// Creates a `FatalIOError` for a directory-level failure.
    pub fn fatal_io_error<S: Into<String>>(
        message: S,
        path: &Path,
        source: std::io::Error,
    ) -> Self {
        MerlinError::FatalIOError {
            message: message.into(),
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wraps an IO error as an `IOError` variant with the specified path.
    pub fn io_error(path: &Path, source: std::io::Error) -> Self {
        MerlinError::IOError {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates a `MetadataParseError` with an optional source.
    pub fn metadata_parse_error<S: Into<String>>(
        message: S,
        source: Option<BoxedSource>,
    ) -> Self {
        MerlinError::MetadataParseError {
            message: message.into(),
            source,
        }
    }

    /// Creates a `TemplateRenderingError` for the named template.
    pub fn template_rendering_error<S: Into<String>>(
        message: S,
        template: &str,
        source: Option<BoxedSource>,
    ) -> Self {
        MerlinError::TemplateRenderingError {
            message: message.into(),
            template: template.to_string(),
            source,
        }
    }

    /// Annotates a per-file error with the path of the file.
    pub fn entry_error(path: &Path, source: MerlinError) -> Self {
        MerlinError::EntryError {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// Returns the innermost error, looking through `EntryError`
    /// annotations.
    pub fn root_cause(&self) -> &MerlinError {
        match self {
            MerlinError::EntryError { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether this error stops a build regardless of the error policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MerlinError::ConfigError { .. }
                | MerlinError::FatalIOError { .. }
        )
    }
}
