// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Configuration Module
//!
//! Configuration for a Merlin build. Values come from, in increasing order
//! of precedence: built-in defaults, a TOML file, environment variables and
//! programmatic overrides (the command line uses the latter).
//!
//! The resulting [`Config`] is a plain value. It is built once at startup
//! and handed by reference to [`crate::site::SiteBuilder::new`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use merlin::core::config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .with_optional_file(".merlin.toml")
//!     .with_env_prefix("MERLIN_")
//!     .with_override("build.fail_fast", false)
//!     .build()
//!     .unwrap();
//!
//! assert!(!config.build.fail_fast);
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toml::Value as TomlValue;

use crate::{MerlinError, Result};

/// Name of the configuration file looked up in the working directory when
/// none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = ".merlin.toml";

/// Prefix of the environment variables that override configuration keys.
pub const ENV_PREFIX: &str = "MERLIN_";

/// The complete configuration of a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_source_dir")]
    /// Root of the source tree.
    pub source_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    /// Output directory. Relative paths are resolved against the source
    /// root.
    pub output_dir: PathBuf,

    #[serde(default = "default_layouts_dir")]
    /// Layout template directory, relative to the source root.
    pub layouts_dir: PathBuf,

    #[serde(default)]
    /// How source files are classified and split.
    pub content: ContentConfig,

    #[serde(default)]
    /// Template engine settings.
    pub template: TemplateConfig,

    #[serde(default)]
    /// Markdown extensions.
    pub markdown: MarkdownConfig,

    #[serde(default)]
    /// Build policy.
    pub build: BuildConfig,
}

/// Settings for content classification and frontmatter splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Extensions rendered as markdown pages.
    pub markdown_extensions: Vec<String>,

    /// Extensions copied verbatim.
    pub passthrough_extensions: Vec<String>,

    /// Path segments starting with this character are private and never
    /// walked.
    pub exclusion_marker: char,

    /// Layout used when the frontmatter does not name one.
    pub default_layout: String,

    /// Line that opens and closes the frontmatter block.
    pub frontmatter_delimiter: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            markdown_extensions: vec!["md".to_string()],
            passthrough_extensions: vec!["html".to_string()],
            exclusion_marker: '_',
            default_layout: "post".to_string(),
            frontmatter_delimiter: "---".to_string(),
        }
    }
}

/// Settings for template rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// File extension of layout templates, without the dot.
    pub extension: String,

    /// Fail on references to undefined variables.
    pub strict_mode: bool,

    /// HTML-escape interpolated values.
    pub escape_html: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            extension: "hbs".to_string(),
            strict_mode: true,
            escape_html: false,
        }
    }
}

/// Optional markdown extensions; plain CommonMark when all are off.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// GitHub-style tables.
    pub tables: bool,
    /// `~~strikethrough~~`.
    pub strikethrough: bool,
    /// Footnote references and definitions.
    pub footnotes: bool,
    /// `- [x]` task lists.
    pub tasklists: bool,
}

/// Settings for the build run itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Abort the build on the first per-file error. When `false`, errors
    /// are recorded on the file's outcome and the walk continues.
    pub fail_fast: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output_dir: default_output_dir(),
            layouts_dir: default_layouts_dir(),
            content: ContentConfig::default(),
            template: TemplateConfig::default(),
            markdown: MarkdownConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }
}

/// Builds a [`Config`] from a file, the environment and overrides.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<PathBuf>,
    file_required: bool,
    env_prefix: Option<String>,
    overrides: Vec<(String, TomlValue)>,
}

impl ConfigBuilder {
    /// Creates a builder that starts from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the given TOML file. The build fails if it is missing.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self.file_required = true;
        self
    }

    /// Reads the given TOML file if it exists and keeps the defaults
    /// otherwise.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self.file_required = false;
        self
    }

    /// Applies environment variables starting with `prefix`.
    ///
    /// `MERLIN_OUTPUT_DIR` sets `output_dir`; a double underscore separates
    /// a section from its key, as in `MERLIN_BUILD__FAIL_FAST`.
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Overrides a single key (`source_dir`, `build.fail_fast`, ...).
    /// Overrides are applied last, in the order they were added.
    pub fn with_override<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<TomlValue>,
    {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Loads, overrides and validates the configuration.
    pub fn build(self) -> Result<Config> {
        let mut config = match &self.config_file {
            Some(path) => load_from_file(path, self.file_required)?,
            None => Config::default(),
        };

        if let Some(prefix) = &self.env_prefix {
            apply_env_overrides(&mut config, prefix)?;
        }

        for (key, value) in &self.overrides {
            apply_config_value(&mut config, key, &toml_to_string(value))?;
        }

        validate_config(&config)?;
        Ok(config)
    }
}

// Internal helper functions

/// Every key accepted by [`ConfigBuilder::with_override`], in dotted form.
const KNOWN_KEYS: &[&str] = &[
    "source_dir",
    "output_dir",
    "layouts_dir",
    "content.markdown_extensions",
    "content.passthrough_extensions",
    "content.exclusion_marker",
    "content.default_layout",
    "content.frontmatter_delimiter",
    "template.extension",
    "template.strict_mode",
    "template.escape_html",
    "markdown.tables",
    "markdown.strikethrough",
    "markdown.footnotes",
    "markdown.tasklists",
    "build.fail_fast",
];

fn load_from_file(path: &Path, required: bool) -> Result<Config> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound && !required => {
            log::debug!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(MerlinError::config_error(
                format!("Failed to read config file {}: {}", path.display(), e),
                Some(path.to_path_buf()),
            ))
        }
    };

    toml::from_str(&content).map_err(|e| {
        MerlinError::config_error(
            format!("Failed to parse config file {}: {}", path.display(), e),
            Some(path.to_path_buf()),
        )
    })
}

fn apply_env_overrides(config: &mut Config, prefix: &str) -> Result<()> {
    let mut vars: Vec<(String, String)> = Vec::new();
    for (key, value) in env::vars_os() {
        let Some(key) = key.to_str().filter(|key| key.starts_with(prefix))
        else {
            continue;
        };
        match value.into_string() {
            Ok(value) => vars.push((key.to_string(), value)),
            Err(_) => log::warn!("Ignoring {}: value is not valid UTF-8", key),
        }
    }
    vars.sort();

    for (key, value) in vars {
        let config_key = key[prefix.len()..]
            .trim_start_matches('_')
            .to_lowercase()
            .replace("__", ".");
        if !KNOWN_KEYS.contains(&config_key.as_str()) {
            log::warn!("Ignoring {}: not a configuration key", key);
            continue;
        }
        apply_config_value(config, &config_key, &value)?;
    }
    Ok(())
}

fn toml_to_string(value: &TomlValue) -> String {
    match value {
        TomlValue::String(s) => s.clone(),
        TomlValue::Array(items) => items
            .iter()
            .map(toml_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn apply_config_value(
    config: &mut Config,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "source_dir" => config.source_dir = PathBuf::from(value),
        "output_dir" => config.output_dir = PathBuf::from(value),
        "layouts_dir" => config.layouts_dir = PathBuf::from(value),
        _ => {
            let Some((section, field)) = key.split_once('.') else {
                return Err(MerlinError::config_error(
                    format!("Unknown configuration key: {}", key),
                    None,
                ));
            };
            match section {
                "content" => {
                    apply_content_value(&mut config.content, field, value)?
                }
                "template" => {
                    apply_template_value(&mut config.template, field, value)?
                }
                "markdown" => {
                    apply_markdown_value(&mut config.markdown, field, value)?
                }
                "build" => match field {
                    "fail_fast" => {
                        config.build.fail_fast = parse_flag(key, value)?
                    }
                    _ => return Err(unknown_key(key)),
                },
                _ => {
                    return Err(MerlinError::config_error(
                        format!("Unknown configuration section: {}", section),
                        None,
                    ));
                }
            }
        }
    }
    Ok(())
}

fn apply_content_value(
    config: &mut ContentConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "markdown_extensions" => config.markdown_extensions = parse_list(value),
        "passthrough_extensions" => {
            config.passthrough_extensions = parse_list(value)
        }
        "exclusion_marker" => {
            let mut chars = value.chars();
            config.exclusion_marker = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(MerlinError::config_error(
                        format!(
                            "Invalid exclusion_marker value '{}': expected a single character",
                            value
                        ),
                        None,
                    ))
                }
            };
        }
        "default_layout" => config.default_layout = value.to_string(),
        "frontmatter_delimiter" => {
            config.frontmatter_delimiter = value.to_string()
        }
        _ => return Err(unknown_key(&format!("content.{}", key))),
    }
    Ok(())
}

fn apply_template_value(
    config: &mut TemplateConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "extension" => {
            config.extension = value.trim_start_matches('.').to_string()
        }
        "strict_mode" => config.strict_mode = parse_flag(key, value)?,
        "escape_html" => config.escape_html = parse_flag(key, value)?,
        _ => return Err(unknown_key(&format!("template.{}", key))),
    }
    Ok(())
}

fn apply_markdown_value(
    config: &mut MarkdownConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    let flag = parse_flag(key, value)?;
    match key {
        "tables" => config.tables = flag,
        "strikethrough" => config.strikethrough = flag,
        "footnotes" => config.footnotes = flag,
        "tasklists" => config.tasklists = flag,
        _ => return Err(unknown_key(&format!("markdown.{}", key))),
    }
    Ok(())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    value.trim().parse().map_err(|e| {
        MerlinError::config_error(
            format!("Invalid {} value '{}': {}", key, value, e),
            None,
        )
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().trim_start_matches('.').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn unknown_key(key: &str) -> MerlinError {
    MerlinError::config_error(
        format!("Unknown configuration key: {}", key),
        None,
    )
}

fn validate_config(config: &Config) -> Result<()> {
    validate_path(&config.source_dir, "source")?;

    let content = &config.content;
    if content.markdown_extensions.is_empty()
        || content.passthrough_extensions.is_empty()
    {
        return Err(MerlinError::config_error(
            "Content extensions cannot be empty",
            None,
        ));
    }

    if let Some(ext) = content.markdown_extensions.iter().find(|ext| {
        content
            .passthrough_extensions
            .iter()
            .any(|other| other.eq_ignore_ascii_case(ext))
    }) {
        return Err(MerlinError::config_error(
            format!(
                "Extension '{}' is both a markdown and a passthrough extension",
                ext
            ),
            None,
        ));
    }

    for (name, value) in [
        ("content.frontmatter_delimiter", &content.frontmatter_delimiter),
        ("content.default_layout", &content.default_layout),
        ("template.extension", &config.template.extension),
    ] {
        if value.trim().is_empty() {
            return Err(MerlinError::config_error(
                format!("{} cannot be empty", name),
                None,
            ));
        }
    }

    Ok(())
}

fn validate_path(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        return Err(MerlinError::config_error(
            format!("{} directory does not exist: {}", name, path.display()),
            Some(path.to_path_buf()),
        ));
    }

    if !path.is_dir() {
        return Err(MerlinError::config_error(
            format!("{} path is not a directory: {}", name, path.display()),
            Some(path.to_path_buf()),
        ));
    }

    Ok(())
}

// Default value functions

fn default_source_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_layouts_dir() -> PathBuf {
    PathBuf::from("_layouts")
}
