//! Configuration types for Markdown-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionOptions`], built
//! via its [`ConversionOptionsBuilder`] or used directly with struct-update
//! syntax over [`ConversionOptions::default()`]. Every knob has a documented
//! default; optional fields whose absence means something other than "off"
//! (header, footer, page numbers) are `Option`s.

use crate::error::Md2PdfError;
use crate::pipeline::document::DocumentTransform;
use crate::pipeline::markup::MarkupTransform;
use crate::plugins::Plugin;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default code-highlight theme name.
pub const DEFAULT_CODE_THEME: &str = "github-light";

/// Default cache directory name, created under the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".md2pdf-cache";

/// Options for a single Markdown-to-PDF conversion.
///
/// # Example
/// ```rust
/// use md2pdf::{ConversionOptions, RendererKind};
///
/// let options = ConversionOptions::builder()
///     .page_size("Letter")
///     .margin("1in,0.75in")
///     .toc(true)
///     .renderer(RendererKind::Lite)
///     .build()
///     .unwrap();
/// assert!(options.toc);
/// ```
#[derive(Clone)]
pub struct ConversionOptions {
    /// Write the PDF here instead of returning the bytes.
    pub output_path: Option<PathBuf>,

    /// Named page format (`A4`, `Letter`, …) or explicit `W x H` dimensions. Default: `A4`.
    pub page_size: String,

    /// Comma-separated CSS lengths, top/right/bottom/left. Default: `1in,1in,1in,1in`.
    ///
    /// Fewer than four values fill from the ones given: right defaults to top,
    /// bottom to top, left to right.
    pub margin: String,

    /// Bundled theme name. Default: `default`.
    pub theme: String,

    /// Single CSS file used as the theme. Takes precedence over `theme`.
    pub theme_file: Option<PathBuf>,

    /// Theme directory (`theme.css`, `fonts/`, `templates/`). Takes precedence over
    /// `theme_file` and `theme`.
    pub theme_dir: Option<PathBuf>,

    /// CSS custom properties appended as a trailing `:root` block.
    pub theme_overrides: BTreeMap<String, String>,

    /// Markdown file rendered as a cover page before the content.
    pub cover_path: Option<PathBuf>,

    /// Header settings. `None` uses the theme template or the derived title.
    pub header: Option<HeaderFooterOptions>,

    /// Footer settings. `None` uses the theme template or page numbers.
    pub footer: Option<HeaderFooterOptions>,

    /// Insert a table of contents. Default: false.
    pub toc: bool,

    /// Enable footnote syntax. Default: true.
    pub footnotes: bool,

    /// Recognise and render `$…$` / `$$…$$` math. Default: false.
    pub math: bool,

    /// Turn ` ```mermaid ` blocks into diagrams. Default: false.
    pub mermaid: bool,

    /// Strip leading YAML front matter and expose it to templates. Default: true.
    pub frontmatter: bool,

    /// Permit `http(s)` assets and images. Default: false.
    pub allow_remote: bool,

    /// Run fenced code blocks through a language formatter. Default: false.
    pub format_code: bool,

    /// Global highlight theme. Default: `github-light`.
    pub code_theme: String,

    /// Per-language highlight theme overrides, keyed by normalised language.
    pub code_theme_by_language: BTreeMap<String, String>,

    /// Primary renderer. Default: [`RendererKind::Chromium`].
    pub renderer: RendererKind,

    /// Renderer used when the primary fails. Default: [`FallbackRenderer::Lite`].
    pub fallback_renderer: FallbackRenderer,

    /// Fail instead of falling back when the browser renderer fails. Default: false.
    pub require_chromium: bool,

    /// Explicit browser executable for the browser renderer.
    pub chrome_executable: Option<PathBuf>,

    /// Local path to the diagram runtime script (`mermaid.min.js`).
    pub mermaid_script: Option<PathBuf>,

    /// Stylesheet href linked when math is enabled. `None` embeds a small built-in sheet.
    pub math_stylesheet: Option<String>,

    /// Per-operation renderer timeout in milliseconds. Default: 60 000.
    pub timeout_ms: u64,

    /// Cache directory, created if absent. Default: `./.md2pdf-cache`.
    pub cache_dir: Option<PathBuf>,

    /// Plugins, applied in list order within each hook category.
    pub plugins: Vec<Plugin>,

    /// Extra document-tree transforms, run after the built-in chain.
    pub document_transforms: Vec<Arc<dyn DocumentTransform>>,

    /// Extra markup-tree transforms, run after the built-in chain.
    pub markup_transforms: Vec<Arc<dyn MarkupTransform>>,

    /// Surface plugin `info` logs at INFO instead of DEBUG. Default: false.
    pub debug: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            page_size: "A4".to_string(),
            margin: "1in,1in,1in,1in".to_string(),
            theme: "default".to_string(),
            theme_file: None,
            theme_dir: None,
            theme_overrides: BTreeMap::new(),
            cover_path: None,
            header: None,
            footer: None,
            toc: false,
            footnotes: true,
            math: false,
            mermaid: false,
            frontmatter: true,
            allow_remote: false,
            format_code: false,
            code_theme: DEFAULT_CODE_THEME.to_string(),
            code_theme_by_language: BTreeMap::new(),
            renderer: RendererKind::Chromium,
            fallback_renderer: FallbackRenderer::Lite,
            require_chromium: false,
            chrome_executable: None,
            mermaid_script: None,
            math_stylesheet: None,
            timeout_ms: 60_000,
            cache_dir: None,
            plugins: Vec::new(),
            document_transforms: Vec::new(),
            markup_transforms: Vec::new(),
            debug: false,
        }
    }
}

impl fmt::Debug for ConversionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOptions")
            .field("output_path", &self.output_path)
            .field("page_size", &self.page_size)
            .field("margin", &self.margin)
            .field("theme", &self.theme)
            .field("theme_file", &self.theme_file)
            .field("theme_dir", &self.theme_dir)
            .field("toc", &self.toc)
            .field("math", &self.math)
            .field("mermaid", &self.mermaid)
            .field("allow_remote", &self.allow_remote)
            .field("renderer", &self.renderer)
            .field("fallback_renderer", &self.fallback_renderer)
            .field("timeout_ms", &self.timeout_ms)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            )
            .field("document_transforms", &self.document_transforms.len())
            .field("markup_transforms", &self.markup_transforms.len())
            .finish()
    }
}

impl ConversionOptions {
    /// Create a new builder for `ConversionOptions`.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }

    /// The renderer to retry with when the primary fails, if any.
    ///
    /// `lite` is terminal: a lite primary never falls back.
    pub fn effective_fallback(&self) -> Option<RendererKind> {
        if self.require_chromium || self.renderer == RendererKind::Lite {
            return None;
        }
        match self.fallback_renderer {
            FallbackRenderer::Lite => Some(RendererKind::Lite),
            FallbackRenderer::None => None,
        }
    }

    /// Check option combinations that can never succeed.
    pub fn validate(&self) -> Result<(), Md2PdfError> {
        if self.timeout_ms == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "timeout must be greater than zero".into(),
            ));
        }
        if self.page_size.trim().is_empty() {
            return Err(Md2PdfError::InvalidConfig("page size must not be empty".into()));
        }
        if self.require_chromium && self.renderer == RendererKind::Lite {
            return Err(Md2PdfError::InvalidConfig(
                "require_chromium cannot be combined with renderer=lite".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.output_path = Some(path.into());
        self
    }

    pub fn page_size(mut self, size: impl Into<String>) -> Self {
        self.options.page_size = size.into();
        self
    }

    pub fn margin(mut self, margin: impl Into<String>) -> Self {
        self.options.margin = margin.into();
        self
    }

    pub fn theme(mut self, name: impl Into<String>) -> Self {
        self.options.theme = name.into();
        self
    }

    pub fn theme_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.theme_file = Some(path.into());
        self
    }

    pub fn theme_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.theme_dir = Some(path.into());
        self
    }

    pub fn theme_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.theme_overrides.insert(key.into(), value.into());
        self
    }

    pub fn cover_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cover_path = Some(path.into());
        self
    }

    pub fn header(mut self, header: HeaderFooterOptions) -> Self {
        self.options.header = Some(header);
        self
    }

    pub fn footer(mut self, footer: HeaderFooterOptions) -> Self {
        self.options.footer = Some(footer);
        self
    }

    pub fn toc(mut self, v: bool) -> Self {
        self.options.toc = v;
        self
    }

    pub fn footnotes(mut self, v: bool) -> Self {
        self.options.footnotes = v;
        self
    }

    pub fn math(mut self, v: bool) -> Self {
        self.options.math = v;
        self
    }

    pub fn mermaid(mut self, v: bool) -> Self {
        self.options.mermaid = v;
        self
    }

    pub fn frontmatter(mut self, v: bool) -> Self {
        self.options.frontmatter = v;
        self
    }

    pub fn allow_remote(mut self, v: bool) -> Self {
        self.options.allow_remote = v;
        self
    }

    pub fn format_code(mut self, v: bool) -> Self {
        self.options.format_code = v;
        self
    }

    pub fn code_theme(mut self, theme: impl Into<String>) -> Self {
        self.options.code_theme = theme.into();
        self
    }

    pub fn code_theme_for(mut self, language: impl Into<String>, theme: impl Into<String>) -> Self {
        self.options
            .code_theme_by_language
            .insert(language.into(), theme.into());
        self
    }

    pub fn renderer(mut self, kind: RendererKind) -> Self {
        self.options.renderer = kind;
        self
    }

    pub fn fallback_renderer(mut self, fallback: FallbackRenderer) -> Self {
        self.options.fallback_renderer = fallback;
        self
    }

    pub fn require_chromium(mut self, v: bool) -> Self {
        self.options.require_chromium = v;
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.chrome_executable = Some(path.into());
        self
    }

    pub fn mermaid_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.mermaid_script = Some(path.into());
        self
    }

    pub fn math_stylesheet(mut self, href: impl Into<String>) -> Self {
        self.options.math_stylesheet = Some(href.into());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.options.timeout_ms = ms;
        self
    }

    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cache_dir = Some(path.into());
        self
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.options.plugins.push(plugin);
        self
    }

    pub fn document_transform(mut self, transform: Arc<dyn DocumentTransform>) -> Self {
        self.options.document_transforms.push(transform);
        self
    }

    pub fn markup_transform(mut self, transform: Arc<dyn MarkupTransform>) -> Self {
        self.options.markup_transforms.push(transform);
        self
    }

    pub fn debug(mut self, v: bool) -> Self {
        self.options.debug = v;
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<ConversionOptions, Md2PdfError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which page renderer produces the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless browser engine: layout-accurate, header/footer templates, diagrams. (default)
    #[default]
    Chromium,
    /// Text-only layout without a browser dependency.
    Lite,
}

impl RendererKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RendererKind::Chromium => "chromium",
            RendererKind::Lite => "lite",
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RendererKind {
    type Err = Md2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(RendererKind::Chromium),
            "lite" => Ok(RendererKind::Lite),
            other => Err(Md2PdfError::InvalidConfig(format!(
                "renderer must be 'chromium' or 'lite', got '{other}'"
            ))),
        }
    }
}

/// What to do when the primary renderer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackRenderer {
    /// Retry once with the lite renderer. (default)
    #[default]
    Lite,
    /// Propagate the primary renderer's error.
    None,
}

impl FromStr for FallbackRenderer {
    type Err = Md2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lite" => Ok(FallbackRenderer::Lite),
            "none" => Ok(FallbackRenderer::None),
            other => Err(Md2PdfError::InvalidConfig(format!(
                "fallback renderer must be 'lite' or 'none', got '{other}'"
            ))),
        }
    }
}

/// Header or footer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFooterOptions {
    /// Title text shown in the generated header.
    pub title: Option<String>,
    /// Show `page / total` in the generated footer. Absent means on.
    pub page_numbers: Option<bool>,
    /// Custom template markup; replaces the theme and generated templates.
    pub template_html: Option<String>,
}
