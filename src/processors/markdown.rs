// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Markdown Rendering
//!
//! Thin wrapper around `pulldown-cmark`. Rendering never fails: malformed
//! markdown still produces best-effort HTML, as CommonMark requires.

use crate::core::config::MarkdownConfig;
use pulldown_cmark::{html, Options as MarkdownOptions, Parser};

/// Renders markdown bodies to HTML.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: MarkdownOptions,
}

impl MarkdownRenderer {
    /// Creates a renderer for plain CommonMark.
    pub fn new() -> Self {
        Self {
            options: MarkdownOptions::empty(),
        }
    }

    /// Creates a renderer with the extensions enabled in `config`.
    pub fn from_config(config: &MarkdownConfig) -> Self {
        Self::new()
            .with_tables(config.tables)
            .with_strikethrough(config.strikethrough)
            .with_footnotes(config.footnotes)
            .with_tasklists(config.tasklists)
    }

    /// Enables or disables table support.
    pub fn with_tables(self, enable: bool) -> Self {
        self.with_option(MarkdownOptions::ENABLE_TABLES, enable)
    }

    /// Enables or disables `~~strikethrough~~`.
    pub fn with_strikethrough(self, enable: bool) -> Self {
        self.with_option(MarkdownOptions::ENABLE_STRIKETHROUGH, enable)
    }

    /// Enables or disables footnotes.
    pub fn with_footnotes(self, enable: bool) -> Self {
        self.with_option(MarkdownOptions::ENABLE_FOOTNOTES, enable)
    }

    /// Enables or disables task list items.
    pub fn with_tasklists(self, enable: bool) -> Self {
        self.with_option(MarkdownOptions::ENABLE_TASKLISTS, enable)
    }

    fn with_option(mut self, option: MarkdownOptions, enable: bool) -> Self {
        self.options.set(option, enable);
        self
    }

    /// Renders `markdown` to an HTML fragment.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, parser);
        html_output
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}
