// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Merlin Library
//!
//! Merlin turns a directory of markdown pages and static HTML files into a
//! ready-to-serve site. Pages are split into frontmatter and body, rendered
//! to HTML and wrapped in a Handlebars layout; static files are copied as
//! they are.
//!
//! The pipeline is driven by [`site::SiteBuilder`]; the other modules are
//! its stages and can be used on their own.

#![doc = include_str!("../README.md")]

/// Configuration and error handling.
pub mod core;

/// Path classification.
pub mod classifier;

/// Command-line interface.
pub mod cli;

/// Frontmatter splitting and typed metadata access.
pub mod content;

/// File reading, writing and copying.
pub mod process;

/// Content body renderers.
pub mod processors;

/// Build orchestration.
pub mod site;

/// Layout rendering.
pub mod template;

pub use crate::core::error::{MerlinError, Result};

/// Renders a named layout with a set of variables.
///
/// [`template::HandlebarsRenderer`] is the implementation used by
/// [`site::SiteBuilder`]; another one can be supplied with
/// [`site::SiteBuilder::with_renderer`].
pub trait TemplateRenderer: Send + Sync + std::fmt::Debug {
    /// Renders `template` with `context` as its variables.
    ///
    /// # Errors
    /// * `TemplateNotFoundError` - no template is named `template`.
    /// * `TemplateRenderingError` - the template failed to compile or
    ///   render.
    fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<String>;

    /// Drops anything cached from earlier renders. Called at the start of
    /// every build so layouts edited between builds are picked up.
    fn clear_cache(&self) {}
}
