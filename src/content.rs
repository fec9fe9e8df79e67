// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Frontmatter
//!
//! Splits a content file into its leading metadata block and the body
//! that follows it:
//!
//! ```text
//! ---
//! layout: page
//! title: About
//! ---
//! # About me
//! ```
//!
//! The block is YAML. Its values are kept as [`MetaValue`]s so callers
//! read them through typed accessors such as [`Frontmatter::get_string`]
//! instead of guessing at the shape of untyped data.

use crate::{MerlinError, Result};
use serde::Serialize;
use serde_yml::Value as YamlValue;
use std::collections::BTreeMap;

/// A single frontmatter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// `~` or `null`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// An integer that fits in an `i64`.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// A string.
    String(String),
    /// A YAML sequence.
    List(Vec<MetaValue>),
    /// A nested mapping.
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            MetaValue::Null => "null",
            MetaValue::Bool(_) => "boolean",
            MetaValue::Integer(_) => "integer",
            MetaValue::Float(_) => "float",
            MetaValue::String(_) => "string",
            MetaValue::List(_) => "list",
            MetaValue::Map(_) => "map",
        }
    }
}

impl TryFrom<YamlValue> for MetaValue {
    type Error = MerlinError;

    /// Converts a parsed YAML value. Tags such as `!date` are dropped and
    /// the tagged value is kept.
    fn try_from(value: YamlValue) -> Result<Self> {
        Ok(match value {
            YamlValue::Null => MetaValue::Null,
            YamlValue::Bool(b) => MetaValue::Bool(b),
            YamlValue::Number(n) => match n.as_i64() {
                Some(i) => MetaValue::Integer(i),
                None => MetaValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            YamlValue::String(s) => MetaValue::String(s),
            YamlValue::Sequence(items) => MetaValue::List(
                items
                    .into_iter()
                    .map(MetaValue::try_from)
                    .collect::<Result<_>>()?,
            ),
            YamlValue::Mapping(map) => MetaValue::Map(
                map.into_iter()
                    .map(|(k, v)| -> Result<(String, MetaValue)> {
                        Ok((key_string(k)?, MetaValue::try_from(v)?))
                    })
                    .collect::<Result<_>>()?,
            ),
            YamlValue::Tagged(tagged) => MetaValue::try_from(tagged.value)?,
        })
    }
}

fn key_string(key: YamlValue) -> Result<String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Tagged(tagged) => key_string(tagged.value),
        _ => Err(MerlinError::metadata_parse_error(
            "frontmatter keys must be strings, numbers or booleans",
            None,
        )),
    }
}

/// The result of splitting a content file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frontmatter {
    /// Parsed metadata; empty when the file has no block.
    pub metadata: BTreeMap<String, MetaValue>,
    /// Everything after the closing delimiter.
    pub body: String,
}

impl Frontmatter {
    /// Returns `field` as a string, `None` when absent.
    ///
    /// Fails with `InvalidFrontmatterFieldError` when the field holds
    /// anything other than a string.
    pub fn get_string(&self, field: &str) -> Result<Option<&str>> {
        match self.metadata.get(field) {
            None => Ok(None),
            Some(MetaValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(invalid_field(field, "string", other)),
        }
    }

    /// Returns `field` as a boolean, `None` when absent.
    pub fn get_bool(&self, field: &str) -> Result<Option<bool>> {
        match self.metadata.get(field) {
            None => Ok(None),
            Some(MetaValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(invalid_field(field, "boolean", other)),
        }
    }

    /// Returns `field` as a number, `None` when absent. Integers are
    /// widened to `f64`.
    pub fn get_number(&self, field: &str) -> Result<Option<f64>> {
        match self.metadata.get(field) {
            None => Ok(None),
            Some(MetaValue::Integer(i)) => Ok(Some(*i as f64)),
            Some(MetaValue::Float(f)) => Ok(Some(*f)),
            Some(other) => Err(invalid_field(field, "number", other)),
        }
    }
}

fn invalid_field(
    field: &str,
    expected: &'static str,
    found: &MetaValue,
) -> MerlinError {
    MerlinError::InvalidFrontmatterFieldError {
        field: field.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// Separates a YAML frontmatter block from the body of a content file.
#[derive(Debug, Clone)]
pub struct FrontmatterSplitter {
    delimiter: String,
}

impl Default for FrontmatterSplitter {
    fn default() -> Self {
        Self::new("---")
    }
}

impl FrontmatterSplitter {
    /// Creates a splitter for blocks fenced by `delimiter` lines.
    ///
    /// # Examples
    ///
    /// ```
    /// use merlin::content::FrontmatterSplitter;
    ///
    /// let splitter = FrontmatterSplitter::new("---");
    /// let fm = splitter.split("---\nlayout: page\n---\n# Hi\n").unwrap();
    /// assert_eq!(fm.get_string("layout").unwrap(), Some("page"));
    /// assert_eq!(fm.body, "# Hi\n");
    /// ```
    pub fn new<S: Into<String>>(delimiter: S) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    /// Splits `content` into metadata and body.
    ///
    /// Without an opening delimiter on the first line the whole input is
    /// the body. An opening delimiter without a closing one, a block that
    /// is not valid YAML, or a block that is not a mapping is a
    /// `MetadataParseError`.
    pub fn split(&self, content: &str) -> Result<Frontmatter> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let Some((first, mut rest)) = next_line(content) else {
            return Ok(Frontmatter::default());
        };
        if !self.is_delimiter(first) {
            return Ok(Frontmatter {
                metadata: BTreeMap::new(),
                body: content.to_string(),
            });
        }

        let block_start = content.len() - rest.len();
        loop {
            let Some((line, after)) = next_line(rest) else {
                return Err(MerlinError::metadata_parse_error(
                    format!(
                        "frontmatter block opened with `{}` is never closed",
                        self.delimiter
                    ),
                    None,
                ));
            };
            if self.is_delimiter(line) {
                let block_end = content.len() - rest.len();
                let metadata =
                    parse_block(&content[block_start..block_end])?;
                return Ok(Frontmatter {
                    metadata,
                    body: after.to_string(),
                });
            }
            rest = after;
        }
    }

    fn is_delimiter(&self, line: &str) -> bool {
        line.trim_end() == self.delimiter
    }
}

/// Returns the next line (without its terminator) and the remaining input.
fn next_line(input: &str) -> Option<(&str, &str)> {
    if input.is_empty() {
        return None;
    }
    Some(match input.find('\n') {
        Some(i) => (&input[..i], &input[i + 1..]),
        None => (input, ""),
    })
}

fn parse_block(block: &str) -> Result<BTreeMap<String, MetaValue>> {
    if block.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let parsed: YamlValue = serde_yml::from_str(block).map_err(|e| {
        MerlinError::metadata_parse_error(
            format!("frontmatter is not valid YAML: {}", e),
            Some(Box::new(e)),
        )
    })?;

    match MetaValue::try_from(parsed)? {
        MetaValue::Map(map) => Ok(map),
        // A block holding only comments.
        MetaValue::Null => Ok(BTreeMap::new()),
        other => Err(MerlinError::metadata_parse_error(
            format!(
                "frontmatter must be a mapping, found a {}",
                other.type_name()
            ),
            None,
        )),
    }
}
