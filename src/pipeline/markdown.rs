//! Markdown to HTML body conversion.
//!
//! ## Why spawn_blocking?
//!
//! The comrak arena and the html5ever `RcDom` are both `!Send`, and parsing,
//! highlighting and formatting are CPU-bound. The whole stage therefore runs
//! on one blocking-pool thread: parse, document chain, `post_parse` hooks,
//! HTML rendering, markup chain, serialisation.

use super::document::{self, DocumentOptions};
use super::markup::{self, dom, MarkupContext};
use crate::assets::AssetPolicy;
use crate::config::ConversionOptions;
use crate::error::Md2PdfError;
use crate::highlighter::Highlighter;
use crate::plugins::{run_post_parse, PluginContext};
use comrak::{format_html, parse_document, Arena, Options};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything one Markdown-to-HTML run needs, owned so it can cross threads.
#[derive(Clone)]
pub struct MarkdownJob {
    pub options: ConversionOptions,
    /// Directory relative images resolve against.
    pub base_dir: PathBuf,
    pub plugin_ctx: PluginContext,
    pub highlighter: Arc<Highlighter>,
}

/// Parser options derived from the conversion toggles.
///
/// Raw HTML is never passed through; the page-break comments are the only
/// markup the document chain recognises.
pub fn parser_options(options: &ConversionOptions) -> Options<'static> {
    let mut opts = Options::default();
    opts.extension.table = true;
    opts.extension.strikethrough = true;
    opts.extension.autolink = true;
    opts.extension.tasklist = true;
    opts.extension.footnotes = options.footnotes;
    opts.extension.math_dollars = options.math;
    if options.frontmatter {
        opts.extension.front_matter_delimiter = Some("---".to_string());
    }
    opts.render.unsafe_ = false;
    opts
}

/// Convert Markdown to the HTML body fragment, synchronously.
pub fn render_html(markdown: &str, job: &MarkdownJob) -> Result<String, Md2PdfError> {
    let options = &job.options;
    let parser = parser_options(options);

    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &parser);

    document::run_chain(
        &arena,
        root,
        DocumentOptions {
            toc: options.toc,
            frontmatter: options.frontmatter,
            format_code: options.format_code,
        },
        &options.document_transforms,
    )?;
    run_post_parse(root, &options.plugins, &job.plugin_ctx)?;

    let mut html = Vec::new();
    format_html(root, &parser, &mut html)
        .map_err(|e| Md2PdfError::Internal(format!("HTML rendering failed: {e}")))?;
    let html = String::from_utf8(html)
        .map_err(|e| Md2PdfError::Internal(format!("UTF-8 conversion failed: {e}")))?;
    debug!("document tree rendered: {} bytes", html.len());

    let ctx = MarkupContext {
        assets: AssetPolicy::new(&job.base_dir, options.allow_remote),
        mermaid: options.mermaid,
        math: options.math,
        code_theme: options.code_theme.clone(),
        code_theme_by_language: options.code_theme_by_language.clone(),
        highlighter: Arc::clone(&job.highlighter),
    };
    let tree = dom::parse(&html)?;
    markup::run_chain(&tree.body, &ctx, &options.markup_transforms)?;
    dom::serialize_children(&tree.body)
}

/// Convert Markdown to the HTML body fragment on the blocking pool.
pub async fn render_html_blocking(markdown: String, job: MarkdownJob) -> Result<String, Md2PdfError> {
    tokio::task::spawn_blocking(move || render_html(&markdown, &job))
        .await
        .map_err(|e| Md2PdfError::Internal(format!("Markdown task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlighter::HighlighterCache;
    use crate::pipeline::markup::theme_set;
    use crate::plugins::Plugin;
    use comrak::nodes::NodeValue;
    use std::collections::BTreeMap;
    use std::path::Path;

    fn job(dir: &Path, options: ConversionOptions) -> MarkdownJob {
        let themes = theme_set(&options.code_theme, &options.code_theme_by_language);
        MarkdownJob {
            plugin_ctx: PluginContext::new(
                dir.to_path_buf(),
                dir.join(".cache"),
                AssetPolicy::new(dir, options.allow_remote),
                false,
            ),
            highlighter: HighlighterCache::new().get(&themes),
            base_dir: dir.to_path_buf(),
            options,
        }
    }

    #[test]
    fn cross_ref_becomes_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let html = render_html("See @ref(intro)\n", &job(dir.path(), ConversionOptions::default())).unwrap();
        assert_eq!(html, "<p>See <a href=\"#intro\">intro</a></p>\n");
    }

    #[test]
    fn headings_get_ids_and_anchors() {
        let dir = tempfile::tempdir().unwrap();
        let html = render_html("# Getting Started\n", &job(dir.path(), ConversionOptions::default())).unwrap();
        assert!(html.contains("id=\"getting-started\""), "got: {html}");
        assert!(html.contains("href=\"#getting-started\""), "got: {html}");
    }

    #[test]
    fn raw_html_is_not_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let html = render_html("<script>alert(1)</script>\n\ntext\n", &job(dir.path(), ConversionOptions::default()))
            .unwrap();
        assert!(!html.contains("<script>"), "got: {html}");
    }

    #[test]
    fn page_break_comment_becomes_div() {
        let dir = tempfile::tempdir().unwrap();
        let html = render_html(
            "one\n\n<!-- page-break -->\n\ntwo\n",
            &job(dir.path(), ConversionOptions::default()),
        )
        .unwrap();
        assert!(html.contains("<div class=\"page-break\"></div>"), "got: {html}");
    }

    #[test]
    fn math_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let off = render_html("$x^2$\n", &job(dir.path(), ConversionOptions::default())).unwrap();
        assert!(!off.contains("<math"), "got: {off}");

        let options = ConversionOptions {
            math: true,
            ..Default::default()
        };
        let on = render_html("$x^2$\n", &job(dir.path(), options)).unwrap();
        assert!(on.contains("math-inline") && on.contains("<math"), "got: {on}");
    }

    #[test]
    fn front_matter_is_not_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let html = render_html(
            "---\ntitle: Secret\n---\n\nBody\n",
            &job(dir.path(), ConversionOptions::default()),
        )
        .unwrap();
        assert!(!html.contains("Secret"), "got: {html}");
        assert!(html.contains("Body"));
    }

    #[test]
    fn post_parse_hook_sees_finished_tree() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = Plugin::new("redact").post_parse(|root, _ctx| {
            for node in root.descendants() {
                if let NodeValue::Text(ref mut t) = node.data.borrow_mut().value {
                    *t = t.replace("secret", "[redacted]");
                }
            }
            Ok(())
        });
        let options = ConversionOptions {
            plugins: vec![plugin],
            ..Default::default()
        };
        let html = render_html("a secret word\n", &job(dir.path(), options)).unwrap();
        assert_eq!(html, "<p>a [redacted] word</p>\n");
    }

    #[test]
    fn remote_image_rejected_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_html(
            "![x](https://example.com/x.png)\n",
            &job(dir.path(), ConversionOptions::default()),
        )
        .unwrap_err();
        assert!(matches!(err, Md2PdfError::RemoteDisabled { ref url } if url == "https://example.com/x.png"));
    }

    #[tokio::test]
    async fn blocking_wrapper_matches_sync() {
        let dir = tempfile::tempdir().unwrap();
        let j = job(dir.path(), ConversionOptions {
            code_theme_by_language: BTreeMap::new(),
            ..Default::default()
        });
        let sync = render_html("*hi*\n", &j).unwrap();
        let blocking = render_html_blocking("*hi*\n".into(), j).await.unwrap();
        assert_eq!(sync, blocking);
    }
}
