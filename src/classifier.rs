// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Path Classification
//!
//! Decides, from a path relative to the source root, what the builder does
//! with an entry and where its output goes. Classification is a pure
//! function of the path and extension: it never touches the filesystem.

use crate::core::config::ContentConfig;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Extension given to rendered content pages.
pub const OUTPUT_EXTENSION: &str = "html";

/// What the builder does with an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Not visited: the root itself, a private path or the output tree.
    /// Skipped directories are pruned with their whole subtree.
    Skip,
    /// Copied byte for byte to the given relative destination.
    Copy(PathBuf),
    /// Rendered through a layout and written to the given relative
    /// destination.
    Transform(PathBuf),
    /// Reported but not written.
    Unsupported,
}

impl Classification {
    /// The relative destination path, if the entry produces output.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Classification::Copy(dest) | Classification::Transform(dest) => {
                Some(dest)
            }
            Classification::Skip | Classification::Unsupported => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::Skip => "skip",
            Classification::Copy(_) => "copy",
            Classification::Transform(_) => "transform",
            Classification::Unsupported => "unsupported",
        })
    }
}

/// One filesystem node visited during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
    /// Path relative to the source root; empty for the root.
    pub relative_path: PathBuf,
    /// Whether the node is a directory.
    pub is_dir: bool,
    /// Extension without the dot, if any.
    pub extension: Option<String>,
}

impl Entry {
    /// Builds an entry for `absolute_path` under `source_root`. Returns
    /// `None` when the path is not inside the root.
    pub fn new(
        source_root: &Path,
        absolute_path: &Path,
        is_dir: bool,
    ) -> Option<Self> {
        let relative_path =
            absolute_path.strip_prefix(source_root).ok()?.to_path_buf();
        let extension = absolute_path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());
        Some(Self {
            absolute_path: absolute_path.to_path_buf(),
            relative_path,
            is_dir,
            extension,
        })
    }
}

/// Classifies entries by relative path and extension.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    exclusion_marker: char,
    markdown_extensions: Vec<String>,
    passthrough_extensions: Vec<String>,
    output_prefix: Option<PathBuf>,
}

impl PathClassifier {
    /// Creates a classifier from the content settings.
    ///
    /// `output_prefix` is the output directory relative to the source root,
    /// or `None` when the output lives outside the source tree.
    pub fn new(config: &ContentConfig, output_prefix: Option<PathBuf>) -> Self {
        Self {
            exclusion_marker: config.exclusion_marker,
            markdown_extensions: config.markdown_extensions.clone(),
            passthrough_extensions: config.passthrough_extensions.clone(),
            output_prefix,
        }
    }

    /// Classifies an [`Entry`]. For directories only `Skip` matters: any
    /// other result means the walker descends into it.
    pub fn classify_entry(&self, entry: &Entry) -> Classification {
        self.classify(&entry.relative_path, entry.extension.as_deref())
    }

    /// Classifies a file path relative to the source root.
    ///
    /// # Examples
    ///
    /// ```
    /// use merlin::classifier::{Classification, PathClassifier};
    /// use merlin::core::config::ContentConfig;
    /// use std::path::{Path, PathBuf};
    ///
    /// let classifier = PathClassifier::new(&ContentConfig::default(), None);
    /// assert_eq!(
    ///     classifier.classify(Path::new("blog/hello.md"), Some("md")),
    ///     Classification::Transform(PathBuf::from("blog/hello.html")),
    /// );
    /// assert_eq!(
    ///     classifier.classify(Path::new("_layouts/post.hbs"), Some("hbs")),
    ///     Classification::Skip,
    /// );
    /// ```
    pub fn classify(
        &self,
        relative_path: &Path,
        extension: Option<&str>,
    ) -> Classification {
        if self.is_excluded(relative_path) {
            return Classification::Skip;
        }

        let Some(extension) = extension else {
            return Classification::Unsupported;
        };
        if contains(&self.passthrough_extensions, extension) {
            Classification::Copy(relative_path.to_path_buf())
        } else if contains(&self.markdown_extensions, extension) {
            Classification::Transform(
                relative_path.with_extension(OUTPUT_EXTENSION),
            )
        } else {
            Classification::Unsupported
        }
    }

    /// Whether the path is the root, private, or inside the output tree.
    pub fn is_excluded(&self, relative_path: &Path) -> bool {
        if relative_path.as_os_str().is_empty() {
            return true;
        }

        if let Some(prefix) = &self.output_prefix {
            if relative_path.starts_with(prefix) {
                return true;
            }
        }

        relative_path.components().any(|component| match component {
            Component::Normal(segment) => segment
                .to_string_lossy()
                .starts_with(self.exclusion_marker),
            _ => false,
        })
    }
}

fn contains(extensions: &[String], extension: &str) -> bool {
    extensions
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(extension))
}
