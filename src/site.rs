// Copyright © 2024 Merlin. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Site Builder
//!
//! Drives a full build:
//!
//! 1. resolve the source and output roots,
//! 2. delete and recreate the output directory,
//! 3. walk the source tree in file-name order, pruning skipped
//!    directories,
//! 4. copy passthrough files and render content files through their
//!    layout,
//! 5. collect one [`BuildOutcome`] per processed file.
//!
//! Directory-level failures always abort the build. Per-file failures
//! abort it too unless `build.fail_fast` is off, in which case they are
//! recorded on the file's outcome and the walk continues. Nothing written
//! before an abort is cleaned up.

use crate::classifier::{Classification, Entry, PathClassifier};
use crate::content::{Frontmatter, FrontmatterSplitter};
use crate::core::config::Config;
use crate::process::{copy_content, read_content, write_content};
use crate::processors::MarkdownRenderer;
use crate::template::HandlebarsRenderer;
use crate::{MerlinError, Result, TemplateRenderer};
use log::{debug, info, warn};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Frontmatter field that selects the layout.
pub const LAYOUT_FIELD: &str = "layout";

/// Template variable holding the rendered page body.
pub const CONTENT_VARIABLE: &str = "content";

/// Template variable holding the page's frontmatter.
pub const PAGE_VARIABLE: &str = "page";

/// The two roots of a build, both absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Root of the source tree.
    pub source_root: PathBuf,
    /// Output directory; recreated on every build and never walked.
    pub output_root: PathBuf,
}

impl Site {
    /// Resolves the roots named in `config`.
    ///
    /// The source root must be readable. A relative output directory is
    /// placed under the source root. An output directory that is the
    /// source root or one of its ancestors is refused, since every build
    /// deletes it.
    pub fn resolve(config: &Config) -> Result<Self> {
        let source_root = fs::canonicalize(&config.source_dir).map_err(|e| {
            MerlinError::fatal_io_error(
                "Cannot read source directory",
                &config.source_dir,
                e,
            )
        })?;

        let output_root = if config.output_dir.is_absolute() {
            config.output_dir.clone()
        } else {
            source_root.join(&config.output_dir)
        };
        let output_root = resolve_lenient(&output_root);

        if source_root.starts_with(&output_root) {
            return Err(MerlinError::config_error(
                format!(
                    "output directory {} would delete the source directory {}",
                    output_root.display(),
                    source_root.display()
                ),
                Some(output_root),
            ));
        }

        Ok(Self {
            source_root,
            output_root,
        })
    }

    /// The output directory relative to the source root, when it is
    /// nested inside it.
    pub fn output_prefix(&self) -> Option<PathBuf> {
        self.output_root
            .strip_prefix(&self.source_root)
            .ok()
            .map(Path::to_path_buf)
    }
}

/// Resolves symlinks in the longest existing ancestor of `path` and
/// appends the components that do not exist yet.
fn resolve_lenient(path: &Path) -> PathBuf {
    let path = normalize(path);
    let mut existing = path.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(resolved) = fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(resolved, |resolved, name| resolved.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return path,
        }
    }
}

/// Removes `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let _ = normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Describes what was done with a file, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// Copied verbatim; holds the lowercased extension.
    Passthrough(String),
    /// Rendered markdown; holds the layout once it is known.
    Markdown(Option<String>),
    /// Not a recognised type; nothing written.
    Unsupported,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Passthrough(ext) => f.write_str(ext),
            ContentType::Markdown(Some(layout)) => {
                write!(f, "markdown {}", layout)
            }
            ContentType::Markdown(None) => f.write_str("markdown"),
            ContentType::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// The result of processing one file.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Path relative to the source root.
    pub relative_path: PathBuf,
    /// What kind of file it was.
    pub content_type: ContentType,
    /// Relative path of the written file, if one was written.
    pub destination: Option<PathBuf>,
    /// The failure, when the build continues past errors.
    pub error: Option<MerlinError>,
}

impl BuildOutcome {
    /// Whether the file was processed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.relative_path.display(), self.content_type)?;
        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}

/// Every outcome of a build, in traversal order.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// One entry per processed file.
    pub outcomes: Vec<BuildOutcome>,
}

impl BuildReport {
    /// Whether any file failed.
    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(|outcome| !outcome.is_ok())
    }

    /// The outcomes that carry an error.
    pub fn failures(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_ok())
    }

    /// Number of files written to the output directory.
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.destination.is_some())
            .count()
    }
}

/// The layout and variables a page is rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    /// Template to render.
    pub layout_name: String,
    /// Template variables: the rendered body under `content` and the
    /// frontmatter under `page`.
    pub variables: JsonValue,
}

impl RenderContext {
    /// Builds the context for a page whose body rendered to `content`.
    ///
    /// The layout comes from the `layout` field, which must be a string,
    /// and falls back to `default_layout`.
    pub fn new(
        frontmatter: &Frontmatter,
        content: String,
        default_layout: &str,
    ) -> Result<Self> {
        let layout_name = frontmatter
            .get_string(LAYOUT_FIELD)?
            .unwrap_or(default_layout)
            .to_string();

        let page = serde_json::to_value(&frontmatter.metadata).map_err(|e| {
            MerlinError::metadata_parse_error(
                format!("Failed to convert frontmatter: {}", e),
                Some(Box::new(e)),
            )
        })?;

        let mut variables = JsonMap::new();
        let _ = variables
            .insert(CONTENT_VARIABLE.to_string(), JsonValue::String(content));
        let _ = variables.insert(PAGE_VARIABLE.to_string(), page);

        Ok(Self {
            layout_name,
            variables: JsonValue::Object(variables),
        })
    }
}

/// Owns one build run.
#[derive(Debug)]
pub struct SiteBuilder {
    site: Site,
    classifier: PathClassifier,
    splitter: FrontmatterSplitter,
    markdown: MarkdownRenderer,
    renderer: Box<dyn TemplateRenderer>,
    default_layout: String,
    fail_fast: bool,
}

impl SiteBuilder {
    /// Prepares a build from `config`.
    ///
    /// The template engine is bound to the layout directory under the
    /// source root; nothing is written yet.
    pub fn new(config: &Config) -> Result<Self> {
        let site = Site::resolve(config)?;
        let layout_dir = site.source_root.join(&config.layouts_dir);
        let renderer = HandlebarsRenderer::new(layout_dir, &config.template);

        Ok(Self {
            classifier: PathClassifier::new(
                &config.content,
                site.output_prefix(),
            ),
            splitter: FrontmatterSplitter::new(
                config.content.frontmatter_delimiter.as_str(),
            ),
            markdown: MarkdownRenderer::from_config(&config.markdown),
            renderer: Box::new(renderer),
            default_layout: config.content.default_layout.clone(),
            fail_fast: config.build.fail_fast,
            site,
        })
    }

    /// Replaces the template renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The resolved roots.
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Runs the build.
    ///
    /// Returns the report of every processed file. Fails on the first
    /// directory-level error, and on the first per-file error when
    /// fail-fast is on; per-file errors are wrapped in `EntryError`.
    pub fn build(&self) -> Result<BuildReport> {
        info!(
            "Building {} into {}",
            self.site.source_root.display(),
            self.site.output_root.display()
        );
        self.renderer.clear_cache();
        self.clear_output()?;

        // The output now exists, so its real location is known.
        let output_root = fs::canonicalize(&self.site.output_root).map_err(|e| {
            MerlinError::fatal_io_error(
                "Cannot resolve output directory",
                &self.site.output_root,
                e,
            )
        })?;

        let mut report = BuildReport::default();
        let walker = WalkDir::new(&self.site.source_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !(entry.path().starts_with(&output_root)
                        || self.is_skipped(entry))
            });

        for item in walker {
            let dir_entry = item.map_err(|e| self.walk_error(e))?;
            if dir_entry.file_type().is_dir() {
                continue;
            }
            let Some(entry) =
                Entry::new(&self.site.source_root, dir_entry.path(), false)
            else {
                continue;
            };

            let outcome = self.process_entry(&entry);
            match outcome.error {
                None => info!("->> {}", outcome),
                Some(err) if self.fail_fast || err.is_fatal() => {
                    return Err(MerlinError::entry_error(
                        &entry.relative_path,
                        err,
                    ));
                }
                Some(_) => warn!("->> {}", outcome),
            }
            report.outcomes.push(outcome);
        }

        info!(
            "Processed {} files, wrote {}",
            report.outcomes.len(),
            report.written()
        );
        Ok(report)
    }

    fn is_skipped(&self, dir_entry: &walkdir::DirEntry) -> bool {
        match Entry::new(
            &self.site.source_root,
            dir_entry.path(),
            dir_entry.file_type().is_dir(),
        ) {
            Some(entry) => {
                let skipped =
                    self.classifier.classify_entry(&entry) == Classification::Skip;
                if skipped {
                    debug!("Skipping {}", entry.relative_path.display());
                }
                skipped
            }
            None => true,
        }
    }

    fn clear_output(&self) -> Result<()> {
        let output = &self.site.output_root;
        match fs::remove_dir_all(output) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(MerlinError::fatal_io_error(
                    "Failed to clear output directory",
                    output,
                    e,
                ))
            }
        }
        fs::create_dir_all(output).map_err(|e| {
            MerlinError::fatal_io_error(
                "Failed to create output directory",
                output,
                e,
            )
        })
    }

    fn walk_error(&self, e: walkdir::Error) -> MerlinError {
        let path = e.path().unwrap_or(&self.site.source_root).to_path_buf();
        let source = e
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
        MerlinError::fatal_io_error("Failed to read source tree", &path, source)
    }

    fn process_entry(&self, entry: &Entry) -> BuildOutcome {
        let classification = self.classifier.classify_entry(entry);
        let mut outcome = BuildOutcome {
            relative_path: entry.relative_path.clone(),
            content_type: ContentType::Unsupported,
            destination: None,
            error: None,
        };

        let result = match &classification {
            Classification::Copy(dest) => {
                outcome.content_type = ContentType::Passthrough(
                    entry
                        .extension
                        .as_deref()
                        .unwrap_or_default()
                        .to_ascii_lowercase(),
                );
                copy_content(&entry.absolute_path, self.site.output_root.join(dest))
                    .map(|_| ())
            }
            Classification::Transform(dest) => {
                outcome.content_type = ContentType::Markdown(None);
                self.render_page(entry).and_then(|(layout, html)| {
                    outcome.content_type = ContentType::Markdown(Some(layout));
                    write_content(self.site.output_root.join(dest), &html)
                })
            }
            Classification::Unsupported | Classification::Skip => Ok(()),
        };

        match result {
            Ok(()) => {
                outcome.destination =
                    classification.destination().map(Path::to_path_buf)
            }
            Err(err) => outcome.error = Some(err),
        }
        outcome
    }

    /// Renders a content file; returns the layout used and the page HTML.
    fn render_page(&self, entry: &Entry) -> Result<(String, String)> {
        let source = read_content(&entry.absolute_path)?;
        let frontmatter = self.splitter.split(&source)?;
        let content = self.markdown.render(&frontmatter.body);
        let context =
            RenderContext::new(&frontmatter, content, &self.default_layout)?;

        debug!(
            "Rendering {} with layout `{}`",
            entry.relative_path.display(),
            context.layout_name
        );
        let html = self
            .renderer
            .render(&context.layout_name, &context.variables)?;
        Ok((context.layout_name, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const POST_LAYOUT: &str = "<html><body>{{content}}</body></html>";

    fn source_tree(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for (name, body) in files {
            let path = temp_dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        temp_dir
    }

    fn config(dir: &TempDir) -> Config {
        Config {
            source_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    fn build(dir: &TempDir) -> Result<BuildReport> {
        SiteBuilder::new(&config(dir))?.build()
    }

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(root)
            .into_iter()
            .map(|entry| entry.unwrap())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                (
                    entry.path().strip_prefix(root).unwrap().to_path_buf(),
                    fs::read(entry.path()).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_builds_pages_and_copies_html() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", POST_LAYOUT),
            ("index.md", "# Hi"),
            ("about.html", "<p>About</p>"),
        ]);

        let report = build(&dir).unwrap();

        let out = dir.path().join("out");
        assert_eq!(
            fs::read_to_string(out.join("index.html")).unwrap(),
            "<html><body><h1>Hi</h1>\n</body></html>"
        );
        assert_eq!(
            fs::read(out.join("about.html")).unwrap(),
            b"<p>About</p>"
        );

        let lines: Vec<String> =
            report.outcomes.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["about.html (html)", "index.md (markdown post)"]);
        assert_eq!(report.written(), 2);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_stale_output_is_removed() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", POST_LAYOUT),
            ("index.md", "# Hi"),
            ("out/stale.html", "old"),
            ("out/old/nested.html", "old"),
        ]);

        let report = build(&dir).unwrap();

        let out = dir.path().join("out");
        assert!(!out.join("stale.html").exists());
        assert!(!out.join("old").exists());
        assert!(out.join("index.html").exists());
        // The output tree is never walked as a source.
        assert!(report
            .outcomes
            .iter()
            .all(|o| !o.relative_path.starts_with("out")));
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", POST_LAYOUT),
            ("index.md", "# Hi"),
            ("blog/first.md", "---\ntitle: First\n---\nHello *world*"),
            ("about.html", "<p>About</p>"),
        ]);
        let out = dir.path().join("out");

        let _ = build(&dir).unwrap();
        let first = snapshot(&out);
        let _ = build(&dir).unwrap();
        let second = snapshot(&out);

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_private_directories_are_pruned() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", POST_LAYOUT),
            ("_drafts/broken.md", "---\nunterminated"),
            ("blog/_private/page.html", "<p>secret</p>"),
            ("blog/page.html", "<p>public</p>"),
        ]);

        let report = build(&dir).unwrap();

        let out = dir.path().join("out");
        assert!(!out.join("_drafts").exists());
        assert!(!out.join("_layouts").exists());
        assert!(!out.join("blog/_private").exists());
        assert!(out.join("blog/page.html").exists());
        assert_eq!(report.outcomes.len(), 1);
    }

    #[test]
    fn test_default_layout_without_frontmatter() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", "[{{content}}]"),
            ("notes/today.md", "plain text"),
        ]);

        let _ = build(&dir).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("out/notes/today.html"))
                .unwrap(),
            "[<p>plain text</p>\n]"
        );
    }

    #[test]
    fn test_layout_from_frontmatter() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", POST_LAYOUT),
            ("_layouts/page.hbs", "<title>{{page.title}}</title>{{content}}"),
            ("about.md", "---\nlayout: page\ntitle: About\n---\nMe."),
        ]);

        let report = build(&dir).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("out/about.html")).unwrap(),
            "<title>About</title><p>Me.</p>\n"
        );
        assert_eq!(
            report.outcomes[0].content_type,
            ContentType::Markdown(Some("page".to_string()))
        );
    }

    #[test]
    fn test_non_string_layout_fails_the_build() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", POST_LAYOUT),
            ("bad.md", "---\nlayout: 3\n---\n# Bad"),
        ]);

        let err = build(&dir).unwrap_err();
        match &err {
            MerlinError::EntryError { path, .. } => {
                assert_eq!(path, Path::new("bad.md"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            err.root_cause(),
            MerlinError::InvalidFrontmatterFieldError { .. }
        ));
        assert!(!dir.path().join("out/bad.html").exists());
    }

    #[test]
    fn test_fail_fast_stops_the_walk() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", POST_LAYOUT),
            ("a.md", "---\nbroken: [\n---\n"),
            ("b.md", "# B"),
        ]);

        let err = build(&dir).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            MerlinError::MetadataParseError { .. }
        ));
        assert!(!dir.path().join("out/b.html").exists());
    }

    #[test]
    fn test_continue_on_error_records_failures() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", POST_LAYOUT),
            ("a.md", "---\nlayout: [post]\n---\n"),
            ("b.md", "# B"),
            ("c.md", "---\nlayout: missing\n---\n"),
        ]);
        let mut config = config(&dir);
        config.build.fail_fast = false;

        let report = SiteBuilder::new(&config).unwrap().build().unwrap();

        assert!(report.has_errors());
        let failed: Vec<&Path> = report
            .failures()
            .map(|o| o.relative_path.as_path())
            .collect();
        assert_eq!(failed, vec![Path::new("a.md"), Path::new("c.md")]);
        assert!(matches!(
            report.outcomes[2].error,
            Some(MerlinError::TemplateNotFoundError { .. })
        ));
        assert!(report.outcomes[2].destination.is_none());
        assert!(dir.path().join("out/b.html").exists());
        assert!(!dir.path().join("out/a.html").exists());
        assert!(!dir.path().join("out/c.html").exists());
    }

    #[test]
    fn test_unsupported_files_are_reported_only() {
        let dir = source_tree(&[("style.css", "body {}"), ("README", "x")]);

        let report = build(&dir).unwrap();

        assert!(!dir.path().join("out/style.css").exists());
        assert!(!dir.path().join("out/README").exists());
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.content_type == ContentType::Unsupported && o.is_ok()));
        assert_eq!(report.written(), 0);
    }

    #[test]
    fn test_missing_layout_is_an_error() {
        let dir = source_tree(&[("index.md", "# Hi")]);
        let err = build(&dir).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            MerlinError::TemplateNotFoundError { .. }
        ));
    }

    #[test]
    fn test_output_outside_source_tree() {
        let dir = source_tree(&[("about.html", "<p>About</p>")]);
        let target = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.output_dir = target.path().join("public");

        let _ = SiteBuilder::new(&config).unwrap().build().unwrap();
        assert!(target.path().join("public/about.html").exists());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_output_must_not_contain_source() {
        let dir = source_tree(&[("about.html", "<p>About</p>")]);
        for output in [PathBuf::from("."), PathBuf::from("nested/../")] {
            let mut config = config(&dir);
            config.output_dir = output;
            let err = SiteBuilder::new(&config).unwrap_err();
            assert!(matches!(err, MerlinError::ConfigError { .. }));
        }
        assert!(dir.path().join("about.html").exists());
    }

    #[test]
    fn test_unreadable_source_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            source_dir: dir.path().join("missing"),
            ..Default::default()
        };
        let err = SiteBuilder::new(&config).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, MerlinError::FatalIOError { .. }));
    }

    #[test]
    fn test_uncreatable_output_is_fatal_in_both_modes() {
        let dir = source_tree(&[("about.html", "<p>About</p>"), ("out", "")]);
        for fail_fast in [true, false] {
            let mut config = config(&dir);
            config.build.fail_fast = fail_fast;

            let err = SiteBuilder::new(&config).unwrap().build().unwrap_err();
            assert!(err.is_fatal());
            assert!(matches!(err, MerlinError::FatalIOError { .. }));
        }
        assert!(dir.path().join("out").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_output_under_symlinked_source_is_not_walked() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        fs::create_dir_all(&real).unwrap();
        fs::write(real.join("about.html"), "<p>About</p>").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let config = Config {
            source_dir: link.clone(),
            output_dir: link.join("out"),
            ..Default::default()
        };
        let builder = SiteBuilder::new(&config).unwrap();
        assert_eq!(builder.site().output_prefix(), Some(PathBuf::from("out")));

        let first = builder.build().unwrap();
        let first_tree = snapshot(&real.join("out"));
        let second = builder.build().unwrap();

        for report in [&first, &second] {
            let paths: Vec<&Path> = report
                .outcomes
                .iter()
                .map(|o| o.relative_path.as_path())
                .collect();
            assert_eq!(paths, vec![Path::new("about.html")]);
        }
        assert!(!real.join("out/out").exists());
        assert_eq!(first_tree, snapshot(&real.join("out")));
    }

    #[test]
    fn test_each_build_rereads_layouts() {
        let dir = source_tree(&[
            ("_layouts/post.hbs", "old {{content}}"),
            ("index.md", "hi"),
        ]);
        let builder = SiteBuilder::new(&config(&dir)).unwrap();
        let page = dir.path().join("out/index.html");

        let _ = builder.build().unwrap();
        assert_eq!(fs::read_to_string(&page).unwrap(), "old <p>hi</p>\n");

        fs::write(dir.path().join("_layouts/post.hbs"), "new {{content}}")
            .unwrap();
        let _ = builder.build().unwrap();
        assert_eq!(fs::read_to_string(&page).unwrap(), "new <p>hi</p>\n");
    }

    #[derive(Debug)]
    struct EchoRenderer;

    impl TemplateRenderer for EchoRenderer {
        fn render(&self, template: &str, context: &JsonValue) -> Result<String> {
            Ok(format!(
                "{}|{}|{}",
                template, context[PAGE_VARIABLE], context[CONTENT_VARIABLE]
            ))
        }
    }

    #[test]
    fn test_custom_renderer_receives_context() {
        let dir = source_tree(&[("a.md", "---\ntitle: A\n---\nx")]);
        let builder = SiteBuilder::new(&config(&dir))
            .unwrap()
            .with_renderer(Box::new(EchoRenderer));

        let _ = builder.build().unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("out/a.html")).unwrap(),
            r#"post|{"title":"A"}|"<p>x</p>\n""#
        );
    }

    #[test]
    fn test_render_context() {
        let frontmatter = FrontmatterSplitter::default()
            .split("---\nlayout: page\n---\n")
            .unwrap();
        let context =
            RenderContext::new(&frontmatter, "<p/>".to_string(), "post")
                .unwrap();
        assert_eq!(context.layout_name, "page");
        assert_eq!(context.variables[CONTENT_VARIABLE], "<p/>");
        assert_eq!(context.variables[PAGE_VARIABLE]["layout"], "page");

        let empty = Frontmatter::default();
        let context =
            RenderContext::new(&empty, String::new(), "post").unwrap();
        assert_eq!(context.layout_name, "post");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/site/./nested/../out")),
            PathBuf::from("/site/out")
        );
    }
}
