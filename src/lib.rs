//! # md2pdf
//!
//! Convert Markdown documents and multi-chapter books to print-ready PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Input      resolve a file or raw text plus its base directory
//!  ├─ 2. Plugins    pre_parse hooks over the raw text
//!  ├─ 3. Metadata   split YAML front matter into template data
//!  ├─ 4. Theme      CSS + header/footer/cover templates
//!  ├─ 5. Trees      document chain (comrak) → HTML → markup chain (html5ever)
//!  ├─ 6. Document   standalone HTML with cover, math CSS, diagram runtime
//!  ├─ 7. Render     headless browser, or the lite renderer as fallback
//!  └─ 8. Output     post_render hooks, then bytes or an atomically written file
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2pdf::{convert, ConversionOptions, ConversionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ConversionOptions::builder()
//!         .toc(true)
//!         .output_path("report.pdf")
//!         .build()?;
//!     let output = convert(ConversionRequest::file("report.md"), &options).await?;
//!     eprintln!("rendered with {} in {}ms", output.stats.renderer, output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Renderers
//!
//! | Renderer   | Needs            | Supports |
//! |------------|------------------|----------|
//! | `chromium` | Chrome/Chromium  | full CSS layout, header/footer templates, diagrams, images |
//! | `lite`     | nothing          | text and headings only |
//!
//! When the browser renderer fails (no browser, timeout, blocked remote
//! resource) the conversion retries once with `lite` unless
//! `fallback_renderer` is `None` or `require_chromium` is set.
//!
//! Only renderer failures trigger the fallback. Configuration, input, asset
//! policy, plugin and output errors are returned as they are, with no retry.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! md2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assets;
pub mod book;
pub mod config;
pub mod convert;
pub mod error;
pub mod formatters;
pub mod highlighter;
pub mod output;
pub mod pipeline;
pub mod plugins;
pub mod renderers;
pub mod theme;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use book::{publish_book, PublishOptions};
pub use config::{ConversionOptions, ConversionOptionsBuilder, FallbackRenderer, HeaderFooterOptions, RendererKind};
pub use convert::{convert, convert_sync, convert_to_file, markdown_to_html, Converter};
pub use error::Md2PdfError;
pub use highlighter::HighlighterCache;
pub use output::{ConversionOutput, ConversionStats, PdfOutput};
pub use pipeline::document::DocumentTransform;
pub use pipeline::input::ConversionRequest;
pub use pipeline::markup::{MarkupContext, MarkupTransform};
pub use plugins::{HookError, Plugin, PluginContext, PluginHooks, PluginLogger};
pub use theme::{load_theme, ThemeResult, ThemeSource};
pub use renderers::{RenderRequest, Renderer};
