// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Content Processors Module
//!
//! Converters from an authoring format to HTML. Each processor is a pure
//! function of its input: no I/O, no failure mode.
//!
//! ## Available Processors
//!
//! - [`markdown`]: CommonMark, with optional extensions
//!
//! ## Usage
//!
//! ```rust
//! use merlin::processors::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new().with_tables(true);
//! let html = renderer.render("# Hello World\n\nThis is a test.");
//! assert!(html.starts_with("<h1>Hello World</h1>"));
//! ```

/// Markdown rendering.
pub mod markdown;

// Re-export commonly used types
pub use markdown::MarkdownRenderer;
