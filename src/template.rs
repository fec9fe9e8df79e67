// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Template Rendering Module
//!
//! Renders named layouts from a layout directory with Handlebars.
//!
//! A layout name maps to a file in the bound directory with the template
//! extension appended: with the default `hbs` extension, `post` is read
//! from `<layouts>/post.hbs` and `partials/nav` from
//! `<layouts>/partials/nav.hbs`.
//!
//! Templates are loaded on the first render call, not at construction,
//! so a site without markdown pages needs no layout directory at all.
//! Every file is registered both as a template and as a partial, which
//! lets layouts include one another (`{{> partials/nav}}`).

use crate::core::config::TemplateConfig;
use crate::{MerlinError, Result, TemplateRenderer};
use handlebars::{Handlebars, RenderError, RenderErrorReason};
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Handlebars renderer bound to a layout directory.
pub struct HandlebarsRenderer {
    engine: RwLock<Handlebars<'static>>,
    layout_dir: PathBuf,
    extension: String,
    strict_mode: bool,
    escape_html: bool,
    loaded: RwLock<Option<BTreeSet<String>>>,
}

impl std::fmt::Debug for HandlebarsRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsRenderer")
            .field("layout_dir", &self.layout_dir)
            .field("extension", &self.extension)
            .field("strict_mode", &self.strict_mode)
            .field("escape_html", &self.escape_html)
            .finish()
    }
}

impl HandlebarsRenderer {
    /// Creates a renderer for the templates in `layout_dir`.
    ///
    /// Nothing is read from disk until the first call to
    /// [`TemplateRenderer::render`].
    pub fn new<P: AsRef<Path>>(layout_dir: P, config: &TemplateConfig) -> Self {
        Self {
            engine: RwLock::new(new_engine(
                config.strict_mode,
                config.escape_html,
            )),
            layout_dir: layout_dir.as_ref().to_path_buf(),
            extension: config.extension.trim_start_matches('.').to_string(),
            strict_mode: config.strict_mode,
            escape_html: config.escape_html,
            loaded: RwLock::new(None),
        }
    }

    /// The directory templates are loaded from.
    pub fn layout_dir(&self) -> &Path {
        &self.layout_dir
    }

    /// Whether a template named `name` exists. Loads the templates if they
    /// have not been loaded yet.
    pub fn has_template(&self, name: &str) -> Result<bool> {
        self.ensure_loaded()?;
        Ok(self
            .loaded
            .read()
            .as_ref()
            .is_some_and(|names| names.contains(name)))
    }

    /// Loads every template under the layout directory, once.
    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded.read().is_some() {
            return Ok(());
        }

        let mut loaded = self.loaded.write();
        if loaded.is_some() {
            return Ok(());
        }

        let mut engine = self.engine.write();
        let mut names = BTreeSet::new();
        for (name, path) in self.discover()? {
            let source = std::fs::read_to_string(&path)
                .map_err(|e| MerlinError::io_error(&path, e))?;

            engine.register_template_string(&name, &source).map_err(|e| {
                MerlinError::template_rendering_error(
                    format!("Failed to compile template: {}", e),
                    &name,
                    Some(Box::new(e)),
                )
            })?;
            engine.register_partial(&name, &source).map_err(|e| {
                MerlinError::template_rendering_error(
                    format!("Failed to register partial: {}", e),
                    &name,
                    Some(Box::new(e)),
                )
            })?;

            log::debug!("Loaded template `{}` from {}", name, path.display());
            let _ = names.insert(name);
        }

        *loaded = Some(names);
        Ok(())
    }

    /// Lists `(name, path)` for every template file in the layout
    /// directory, sorted by path. A missing directory has no templates.
    fn discover(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.layout_dir.is_dir() {
            log::debug!(
                "Layout directory {} does not exist",
                self.layout_dir.display()
            );
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        for entry in WalkDir::new(&self.layout_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .unwrap_or(&self.layout_dir)
                    .to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop"));
                MerlinError::io_error(&path, source)
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let matches_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == self.extension);
            if !matches_extension {
                continue;
            }

            if let Some(name) = self.template_name(path) {
                templates.push((name, path.to_path_buf()));
            }
        }
        Ok(templates)
    }

    /// `<layouts>/partials/nav.hbs` → `partials/nav`.
    fn template_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.layout_dir).ok()?;
        let stem = relative.with_extension("");
        let segments: Vec<&str> = stem
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(segments.join("/"))
    }

    fn map_render_error(&self, template: &str, e: RenderError) -> MerlinError {
        match e.reason() {
            RenderErrorReason::TemplateNotFound(name)
            | RenderErrorReason::PartialNotFound(name) => {
                MerlinError::TemplateNotFoundError {
                    template: name.clone(),
                    layout_dir: self.layout_dir.clone(),
                }
            }
            _ => MerlinError::template_rendering_error(
                format!("Template rendering failed: {}", e),
                template,
                Some(Box::new(e)),
            ),
        }
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &JsonValue) -> Result<String> {
        if !self.has_template(template)? {
            return Err(MerlinError::TemplateNotFoundError {
                template: template.to_string(),
                layout_dir: self.layout_dir.clone(),
            });
        }

        self.engine
            .read()
            .render(template, context)
            .map_err(|e| self.map_render_error(template, e))
    }

    fn clear_cache(&self) {
        let mut loaded = self.loaded.write();
        *self.engine.write() = new_engine(self.strict_mode, self.escape_html);
        *loaded = None;
    }
}

fn new_engine(strict_mode: bool, escape_html: bool) -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(strict_mode);
    if escape_html {
        handlebars.register_escape_fn(handlebars::html_escape);
    } else {
        handlebars.register_escape_fn(handlebars::no_escape);
    }
    handlebars
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn layouts(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for (name, body) in files {
            let path = temp_dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        temp_dir
    }

    fn renderer(dir: &TempDir) -> HandlebarsRenderer {
        HandlebarsRenderer::new(dir.path(), &TemplateConfig::default())
    }

    #[test]
    fn test_render_content() {
        let dir = layouts(&[(
            "post.hbs",
            "<html><body>{{content}}</body></html>",
        )]);
        let html = renderer(&dir)
            .render("post", &json!({ "content": "<h1>Hi</h1>" }))
            .unwrap();
        assert_eq!(html, "<html><body><h1>Hi</h1></body></html>");
    }

    #[test]
    fn test_escaping_can_be_enabled() {
        let dir = layouts(&[("post.hbs", "{{content}}")]);
        let config = TemplateConfig {
            escape_html: true,
            ..Default::default()
        };
        let html = HandlebarsRenderer::new(dir.path(), &config)
            .render("post", &json!({ "content": "<b>x</b>" }))
            .unwrap();
        assert_eq!(html, "&lt;b&gt;x&lt;/b&gt;");
    }

    #[test]
    fn test_templates_include_each_other() {
        let dir = layouts(&[
            ("post.hbs", "{{> partials/header}}<main>{{content}}</main>"),
            ("partials/header.hbs", "<header>{{page.title}}</header>"),
        ]);
        let html = renderer(&dir)
            .render(
                "post",
                &json!({ "content": "body", "page": { "title": "Hi" } }),
            )
            .unwrap();
        assert_eq!(html, "<header>Hi</header><main>body</main>");
    }

    #[test]
    fn test_missing_template() {
        let dir = layouts(&[("post.hbs", "{{content}}")]);
        let err = renderer(&dir)
            .render("page", &json!({ "content": "" }))
            .unwrap_err();
        match err {
            MerlinError::TemplateNotFoundError { template, .. } => {
                assert_eq!(template, "page")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_partial() {
        let dir = layouts(&[("post.hbs", "{{> nav}}{{content}}")]);
        let err = renderer(&dir)
            .render("post", &json!({ "content": "" }))
            .unwrap_err();
        assert!(matches!(err, MerlinError::TemplateNotFoundError { .. }));
    }

    #[test]
    fn test_missing_layout_dir() {
        let dir = TempDir::new().unwrap();
        let renderer = HandlebarsRenderer::new(
            dir.path().join("_layouts"),
            &TemplateConfig::default(),
        );
        let err = renderer.render("post", &json!({})).unwrap_err();
        assert!(matches!(err, MerlinError::TemplateNotFoundError { .. }));
    }

    #[test]
    fn test_undefined_variable_in_strict_mode() {
        let dir = layouts(&[("post.hbs", "{{content}}{{missing}}")]);
        let err = renderer(&dir)
            .render("post", &json!({ "content": "x" }))
            .unwrap_err();
        assert!(matches!(err, MerlinError::TemplateRenderingError { .. }));
    }

    #[test]
    fn test_undefined_variable_in_lenient_mode() {
        let dir = layouts(&[("post.hbs", "{{content}}{{missing}}")]);
        let config = TemplateConfig {
            strict_mode: false,
            ..Default::default()
        };
        let html = HandlebarsRenderer::new(dir.path(), &config)
            .render("post", &json!({ "content": "x" }))
            .unwrap();
        assert_eq!(html, "x");
    }

    #[test]
    fn test_syntax_error() {
        let dir = layouts(&[("post.hbs", "{{#if content}}unclosed")]);
        let err = renderer(&dir)
            .render("post", &json!({ "content": "x" }))
            .unwrap_err();
        assert!(matches!(err, MerlinError::TemplateRenderingError { .. }));
    }

    #[test]
    fn test_clear_cache_rereads_templates() {
        let dir = layouts(&[("post.hbs", "old {{content}}")]);
        let renderer = renderer(&dir);
        let context = json!({ "content": "x" });
        assert_eq!(renderer.render("post", &context).unwrap(), "old x");

        fs::write(dir.path().join("post.hbs"), "new {{content}}").unwrap();
        fs::write(dir.path().join("page.hbs"), "page").unwrap();
        assert_eq!(renderer.render("post", &context).unwrap(), "old x");
        assert!(!renderer.has_template("page").unwrap());

        renderer.clear_cache();
        assert_eq!(renderer.render("post", &context).unwrap(), "new x");
        assert!(renderer.has_template("page").unwrap());
    }

    #[test]
    fn test_other_extensions_are_ignored() {
        let dir = layouts(&[
            ("post.hbs", "{{content}}"),
            ("notes.txt", "not a template"),
        ]);
        let renderer = renderer(&dir);
        assert!(renderer.has_template("post").unwrap());
        assert!(!renderer.has_template("notes").unwrap());
    }
}
