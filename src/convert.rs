//! Conversion entry points: the orchestrator that drives every stage.
//!
//! ```text
//! resolve input ─▶ cache dir + plugin context ─▶ pre_parse ─▶ front matter
//!   ─▶ theme ─▶ markdown → body HTML (post_parse inside) ─▶ cover
//!   ─▶ HTML document ─▶ pre_render ─▶ header/footer ─▶ render (+ fallback)
//!   ─▶ post_render ─▶ write file | return bytes
//! ```
//!
//! The write step is last, so a failed conversion never leaves an output
//! file behind.

use crate::assets::{absolutize, AssetPolicy};
use crate::config::{ConversionOptions, DEFAULT_CACHE_DIR};
use crate::error::Md2PdfError;
use crate::highlighter::{global_cache, HighlighterCache};
use crate::output::{write_pdf, ConversionOutput, ConversionStats, PdfOutput};
use crate::pipeline::frontmatter::{self, TemplateData};
use crate::pipeline::header_footer;
use crate::pipeline::input::{read_markdown, resolve_input, ConversionRequest};
use crate::pipeline::markdown::{render_html_blocking, MarkdownJob};
use crate::pipeline::markup::theme_set;
use crate::pipeline::template::{apply_cover_template, build_html_document, DiagramScript, DocumentParts, MATH_CSS};
use crate::plugins::{run_post_render, run_pre_parse, run_pre_render, PluginContext};
use crate::renderers::geometry::PageGeometry;
use crate::renderers::{render_with_fallback, renderer_for, RenderRequest};
use crate::theme::{load_theme, ThemeSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Diagram runtime loaded when remote access is allowed and no local script is set.
pub const MERMAID_CDN: &str = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// Runs conversions against an injected highlighter cache.
///
/// The free functions share one process-wide cache; a `Converter` built with
/// [`Converter::new`] keeps its own, which keeps tests isolated.
#[derive(Debug, Clone)]
pub struct Converter {
    highlighters: Arc<HighlighterCache>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    /// A converter with a fresh, private highlighter cache.
    pub fn new() -> Self {
        Self::with_cache(Arc::new(HighlighterCache::new()))
    }

    pub fn with_cache(highlighters: Arc<HighlighterCache>) -> Self {
        Self { highlighters }
    }

    pub fn highlighter_cache(&self) -> &Arc<HighlighterCache> {
        &self.highlighters
    }

    /// Convert Markdown to PDF.
    ///
    /// Returns the bytes, or writes them to `options.output_path` when set.
    ///
    /// # Errors
    /// - `FileNotFound` for a missing input or cover file, before any transform runs
    /// - `RemoteDisabled` for a remote image while remote access is off
    /// - `UnknownTheme` for an unbundled theme name
    /// - renderer errors when the primary fails and no fallback applies
    pub async fn convert(
        &self,
        request: impl Into<ConversionRequest>,
        options: &ConversionOptions,
    ) -> Result<ConversionOutput, Md2PdfError> {
        let total_start = Instant::now();
        let request = request.into();
        options.validate()?;

        // ── Step 1: Resolve input ────────────────────────────────────────
        let resolved = resolve_input(&request).await?;
        info!("Starting conversion in {}", resolved.base_dir.display());

        // ── Step 2: Cache directory and plugin context ───────────────────
        let cwd = std::env::current_dir()
            .map_err(|e| Md2PdfError::Internal(format!("working directory: {e}")))?;
        let cache_dir = match options.cache_dir {
            Some(ref dir) => absolutize(dir),
            None => cwd.join(DEFAULT_CACHE_DIR),
        };
        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| Md2PdfError::from_io(&cache_dir, e))?;
        let assets = AssetPolicy::new(&resolved.base_dir, options.allow_remote);
        let plugin_ctx = PluginContext::new(cwd, cache_dir, assets, options.debug);

        // ── Step 3: pre_parse hooks ──────────────────────────────────────
        let markdown = run_pre_parse(resolved.markdown, &options.plugins, &plugin_ctx)?;

        // ── Step 4: Front matter ─────────────────────────────────────────
        let (body, mut data) = if options.frontmatter {
            frontmatter::split(&markdown)
        } else {
            (markdown, TemplateData::new())
        };
        if let Some(title) = resolved.derived_title {
            data.entry("title".to_string()).or_insert(title);
        }

        // ── Step 5: Theme ────────────────────────────────────────────────
        let theme = load_theme(&ThemeSource::from_options(options), &options.theme_overrides).await?;

        // ── Step 6: Markdown → body HTML ─────────────────────────────────
        let markdown_start = Instant::now();
        let highlighter = self
            .highlighters
            .get(&theme_set(&options.code_theme, &options.code_theme_by_language));
        let job = MarkdownJob {
            options: options.clone(),
            base_dir: resolved.base_dir.clone(),
            plugin_ctx: plugin_ctx.clone(),
            highlighter,
        };
        let body_html = render_html_blocking(body, job.clone()).await?;

        // ── Step 7: Cover ────────────────────────────────────────────────
        let cover_html = match options.cover_path {
            Some(ref path) => {
                let html = render_cover(path, &job).await?;
                Some(apply_cover_template(&html, theme.templates.cover.as_deref(), &data))
            }
            None => None,
        };
        let markdown_duration_ms = markdown_start.elapsed().as_millis() as u64;
        debug!("Markdown stage finished in {}ms", markdown_duration_ms);

        // ── Step 8: HTML document ────────────────────────────────────────
        let script = if options.mermaid {
            diagram_script(options).await?
        } else {
            None
        };
        let (math_css_href, math_css) = match (options.math, options.math_stylesheet.as_deref()) {
            (false, _) => (None, None),
            (true, Some(href)) => (Some(href), None),
            (true, None) => (None, Some(MATH_CSS)),
        };
        let html = build_html_document(&DocumentParts {
            body_html: &body_html,
            cover_html: cover_html.as_deref(),
            theme_css: &theme.css,
            math_css_href,
            math_css,
            script: script.as_ref(),
            title: data.get("title").map(String::as_str),
        });

        // ── Step 9: pre_render hooks ─────────────────────────────────────
        let html = run_pre_render(html, &options.plugins, &plugin_ctx)?;

        // ── Step 10: Header / footer ─────────────────────────────────────
        let header_footer = header_footer::build(
            options.header.as_ref(),
            options.footer.as_ref(),
            &theme.templates,
            &data,
        );

        // ── Step 11: Render ──────────────────────────────────────────────
        let render_start = Instant::now();
        let primary = renderer_for(options.renderer, options.chrome_executable.clone());
        let fallback = options
            .effective_fallback()
            .map(|kind| renderer_for(kind, options.chrome_executable.clone()));
        let outcome = render_with_fallback(
            primary.as_ref(),
            fallback.as_deref(),
            RenderRequest {
                html,
                base_dir: resolved.base_dir,
                geometry: PageGeometry::parse(&options.page_size, &options.margin),
                header_footer,
                allow_remote: options.allow_remote,
                timeout: Duration::from_millis(options.timeout_ms),
                mermaid: options.mermaid,
            },
        )
        .await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;

        // ── Step 12: post_render hooks ───────────────────────────────────
        let pdf = run_post_render(outcome.pdf, &options.plugins, &plugin_ctx)?;

        let stats = ConversionStats {
            renderer: outcome.renderer.to_string(),
            fallback_reason: outcome.fallback_reason,
            pdf_bytes: pdf.len(),
            markdown_duration_ms,
            render_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        // ── Step 13: Output ──────────────────────────────────────────────
        let output = match options.output_path {
            Some(ref path) => {
                write_pdf(path, &pdf).await?;
                info!("Wrote {} ({} bytes)", path.display(), pdf.len());
                PdfOutput::Written(path.clone())
            }
            None => PdfOutput::Bytes(pdf),
        };

        info!(
            "Conversion complete with {} in {}ms",
            stats.renderer, stats.total_duration_ms
        );
        Ok(ConversionOutput { output, stats })
    }

    /// Convert Markdown to the HTML body fragment without rendering a PDF.
    ///
    /// Runs both transform chains and the `post_parse` hooks; front matter
    /// is split off first when enabled.
    pub async fn markdown_to_html(
        &self,
        markdown: &str,
        base_dir: impl AsRef<Path>,
        options: &ConversionOptions,
    ) -> Result<String, Md2PdfError> {
        let base_dir = absolutize(base_dir.as_ref());
        let cwd = std::env::current_dir()
            .map_err(|e| Md2PdfError::Internal(format!("working directory: {e}")))?;
        let cache_dir = options
            .cache_dir
            .as_deref()
            .map(absolutize)
            .unwrap_or_else(|| cwd.join(DEFAULT_CACHE_DIR));
        let body = if options.frontmatter {
            frontmatter::split(markdown).0
        } else {
            markdown.to_string()
        };
        let job = MarkdownJob {
            options: options.clone(),
            plugin_ctx: PluginContext::new(
                cwd,
                cache_dir,
                AssetPolicy::new(&base_dir, options.allow_remote),
                options.debug,
            ),
            highlighter: self
                .highlighters
                .get(&theme_set(&options.code_theme, &options.code_theme_by_language)),
            base_dir,
        };
        render_html_blocking(body, job).await
    }
}

/// Render the cover file with the table of contents off and no plugin hooks.
async fn render_cover(path: &Path, job: &MarkdownJob) -> Result<String, Md2PdfError> {
    let path = absolutize(path);
    let markdown = read_markdown(&path).await?;
    let mut cover_job = job.clone();
    cover_job.options.toc = false;
    cover_job.options.plugins.clear();
    cover_job.base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| job.base_dir.clone());
    let body = if cover_job.options.frontmatter {
        frontmatter::split(&markdown).0
    } else {
        markdown
    };
    debug!("Rendering cover {}", path.display());
    render_html_blocking(body, cover_job).await
}

/// The diagram runtime: a local script, else the CDN when remote access is allowed.
async fn diagram_script(options: &ConversionOptions) -> Result<Option<DiagramScript>, Md2PdfError> {
    if let Some(ref path) = options.mermaid_script {
        let js = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Md2PdfError::from_io(path, e))?;
        return Ok(Some(DiagramScript::Inline(js)));
    }
    if options.allow_remote {
        return Ok(Some(DiagramScript::Src(MERMAID_CDN.to_string())));
    }
    warn!("Diagrams enabled but no diagram runtime available; set mermaid_script or allow remote access");
    Ok(None)
}

/// Convert Markdown to PDF using the process-wide highlighter cache.
///
/// This is the primary entry point for the library.
pub async fn convert(
    request: impl Into<ConversionRequest>,
    options: &ConversionOptions,
) -> Result<ConversionOutput, Md2PdfError> {
    Converter::with_cache(global_cache()).convert(request, options).await
}

/// Convert and write the PDF to `output_path`, overriding `options.output_path`.
pub async fn convert_to_file(
    request: impl Into<ConversionRequest>,
    output_path: impl Into<PathBuf>,
    options: &ConversionOptions,
) -> Result<ConversionStats, Md2PdfError> {
    let mut options = options.clone();
    options.output_path = Some(output_path.into());
    Ok(convert(request, &options).await?.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    request: impl Into<ConversionRequest>,
    options: &ConversionOptions,
) -> Result<ConversionOutput, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(request, options))
}

/// Convert Markdown to the HTML body fragment using the process-wide cache.
pub async fn markdown_to_html(
    markdown: &str,
    base_dir: impl AsRef<Path>,
    options: &ConversionOptions,
) -> Result<String, Md2PdfError> {
    Converter::with_cache(global_cache())
        .markdown_to_html(markdown, base_dir, options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererKind;
    use crate::plugins::Plugin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lite(dir: &Path) -> ConversionOptions {
        ConversionOptions {
            renderer: RendererKind::Lite,
            cache_dir: Some(dir.join(".cache")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn text_request_returns_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let out = Converter::new()
            .convert(ConversionRequest::text_in("# Hi\n\nBody.\n", dir.path()), &lite(dir.path()))
            .await
            .unwrap();
        assert!(out.pdf().unwrap().starts_with(b"%PDF"));
        assert_eq!(out.stats.renderer, "lite");
        assert!(dir.path().join(".cache").is_dir());
    }

    #[tokio::test]
    async fn missing_input_fails_before_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut options = lite(dir.path());
        options.plugins.push(Plugin::new("count").pre_parse(move |md, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(md)
        }));
        let err = Converter::new()
            .convert(dir.path().join("absent.md"), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::FileNotFound { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hooks_fold_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = lite(dir.path());
        options.plugins = vec![
            Plugin::new("a").pre_render(|html, _| Ok(html.replace("MARK", "A"))),
            Plugin::new("b").pre_render(|html, _| {
                assert!(html.contains(">A<"), "first hook must run first");
                Ok(html)
            }),
            Plugin::new("tail").post_render(|mut pdf, _| {
                pdf.extend_from_slice(b"%tail");
                Ok(pdf)
            }),
        ];
        let out = Converter::new()
            .convert(ConversionRequest::text_in("MARK\n", dir.path()), &options)
            .await
            .unwrap();
        assert!(out.pdf().unwrap().ends_with(b"%tail"));
    }

    #[tokio::test]
    async fn failing_hook_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.pdf");
        let mut options = lite(dir.path());
        options.output_path = Some(target.clone());
        options.plugins.push(Plugin::new("boom").post_render(|_, _| Err("no".into())));
        let err = Converter::new()
            .convert(ConversionRequest::text_in("x\n", dir.path()), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::Plugin { hook: "post_render", .. }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn cover_uses_theme_template_and_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        let theme = dir.path().join("theme");
        std::fs::create_dir_all(theme.join("templates")).unwrap();
        std::fs::write(theme.join("theme.css"), "body{}").unwrap();
        std::fs::write(
            theme.join("templates/cover.html"),
            "<div class=\"my-cover\">{{content}}<p>{{author}}</p></div>",
        )
        .unwrap();
        std::fs::write(dir.path().join("cover.md"), "# Big Title\n").unwrap();

        let seen = Arc::new(std::sync::Mutex::new(String::new()));
        let sink = Arc::clone(&seen);
        let mut options = lite(dir.path());
        options.theme_dir = Some(theme);
        options.cover_path = Some(dir.path().join("cover.md"));
        options.plugins.push(Plugin::new("spy").pre_render(move |html, _| {
            *sink.lock().unwrap() = html.clone();
            Ok(html)
        }));

        Converter::new()
            .convert(
                ConversionRequest::text_in("---\nauthor: Ada & Co\n---\n\nBody\n", dir.path()),
                &options,
            )
            .await
            .unwrap();
        let html = seen.lock().unwrap().clone();
        assert!(html.contains("<div class=\"my-cover\"><h1"), "got: {html}");
        assert!(html.contains("<p>Ada &amp; Co</p>"), "got: {html}");
        assert!(!html.contains("author:"), "front matter leaked: {html}");
    }

    #[tokio::test]
    async fn markdown_to_html_runs_both_chains() {
        let dir = tempfile::tempdir().unwrap();
        let html = Converter::new()
            .markdown_to_html("# Intro\n\nSee @ref(intro)\n", dir.path(), &lite(dir.path()))
            .await
            .unwrap();
        assert!(html.contains("<h1 id=\"intro\">"), "got: {html}");
        assert!(html.contains("<a href=\"#intro\">intro</a>"), "got: {html}");
    }

    #[tokio::test]
    async fn math_stylesheet_selection() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(std::sync::Mutex::new(String::new()));
        let sink = Arc::clone(&seen);
        let mut options = lite(dir.path());
        options.math = true;
        options.plugins.push(Plugin::new("spy").pre_render(move |html, _| {
            *sink.lock().unwrap() = html.clone();
            Ok(html)
        }));
        Converter::new()
            .convert(ConversionRequest::text_in("$x$\n", dir.path()), &options)
            .await
            .unwrap();
        assert!(seen.lock().unwrap().contains("Latin Modern Math"));
    }
}
