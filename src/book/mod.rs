//! Book publishing: many Markdown files, one PDF.
//!
//! ```text
//! book.yaml ─▶ load_manifest (validate, check files) ─▶ assemble_book ─▶ convert
//! ```
//!
//! The assembled document is converted as raw text whose base directory is
//! the manifest's directory, so relative image paths in chapters resolve
//! from there.

pub mod assemble;
pub mod manifest;
pub mod profiles;

pub use assemble::{assemble, assemble_book, Section, SECTION_BREAK};
pub use manifest::{load_manifest, parse_manifest, BookManifest, LoadedBook};
pub use profiles::{list_profiles, resolve_profile, FontStacks, PrintProfile};

use crate::config::{ConversionOptions, HeaderFooterOptions, RendererKind};
use crate::convert::convert;
use crate::error::Md2PdfError;
use crate::output::ConversionOutput;
use crate::pipeline::input::ConversionRequest;
use std::path::{Path, PathBuf};
use tracing::info;

/// Overrides applied on top of the manifest.
///
/// `base` supplies everything the manifest cannot set (plugins, browser
/// executable, cache directory, timeout).
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub output_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub page_size: Option<String>,
    pub margin: Option<String>,
    pub renderer: Option<RendererKind>,
    pub require_chromium: Option<bool>,
    pub base: ConversionOptions,
}

/// Publish the book described by `manifest_path`.
///
/// Output goes to `<manifest dir>/<title>.pdf` (or `book.pdf`) unless an
/// output path is given.
pub async fn publish_book(
    manifest_path: impl AsRef<Path>,
    publish: &PublishOptions,
) -> Result<ConversionOutput, Md2PdfError> {
    let book = load_manifest(manifest_path).await?;
    let markdown = assemble_book(&book).await?;
    let options = book_options(&book, publish);
    info!(
        "Publishing {} chapters to {}",
        book.chapters.len(),
        options
            .output_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    );
    convert(ConversionRequest::text_in(markdown, &book.base_dir), &options).await
}

/// Conversion options for a book: publish overrides, then the manifest, then
/// the profile, then `publish.base`.
pub fn book_options(book: &LoadedBook, publish: &PublishOptions) -> ConversionOptions {
    let m = &book.manifest;
    let mut options = publish.base.clone();
    let profile = publish
        .profile
        .as_deref()
        .or(m.profile.as_deref())
        .and_then(resolve_profile);

    if let Some(size) = publish
        .page_size
        .clone()
        .or_else(|| m.page_size.clone())
        .or_else(|| profile.map(|p| p.page_size.to_string()))
    {
        options.page_size = size;
    }
    if let Some(margin) = publish
        .margin
        .clone()
        .or_else(|| m.margin.clone())
        .or_else(|| profile.map(|p| p.margin.to_string()))
    {
        options.margin = margin;
    }
    if let Some(profile) = profile {
        for (key, stack) in profile.font_overrides() {
            options
                .theme_overrides
                .entry(key.to_string())
                .or_insert_with(|| stack.to_string());
        }
    }

    if let Some(ref theme) = m.theme {
        options.theme = theme.clone();
    }
    if let Some(ref dir) = m.theme_dir {
        options.theme_dir = Some(book.base_dir.join(dir));
    }
    if let Some(ref file) = m.theme_file {
        options.theme_file = Some(book.base_dir.join(file));
    }
    options
        .theme_overrides
        .extend(m.theme_overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

    let toggles = [
        (m.toc, &mut options.toc),
        (m.footnotes, &mut options.footnotes),
        (m.mermaid, &mut options.mermaid),
        (m.math, &mut options.math),
        (m.frontmatter, &mut options.frontmatter),
        (m.allow_remote, &mut options.allow_remote),
        (m.format_code, &mut options.format_code),
    ];
    for (value, slot) in toggles {
        if let Some(v) = value {
            *slot = v;
        }
    }

    if let Some(renderer) = publish.renderer.or(m.renderer) {
        options.renderer = renderer;
    }
    if let Some(require) = publish.require_chromium.or(m.require_chromium) {
        options.require_chromium = require;
    }

    options.header = Some(HeaderFooterOptions {
        title: m.title.clone(),
        ..options.header.unwrap_or_default()
    });
    options.output_path = Some(
        publish
            .output_path
            .clone()
            .unwrap_or_else(|| book.base_dir.join(output_file_name(m.title.as_deref()))),
    );
    options
}

/// `<title>.pdf` with path separators replaced, or `book.pdf`.
fn output_file_name(title: Option<&str>) -> String {
    let stem = title
        .map(|t| t.replace(['/', '\\'], "-"))
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "book".to_string());
    format!("{stem}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loaded(manifest: BookManifest) -> LoadedBook {
        LoadedBook {
            manifest,
            path: PathBuf::from("/books/guide/book.yaml"),
            base_dir: PathBuf::from("/books/guide"),
            chapters: Vec::new(),
            appendices: Vec::new(),
        }
    }

    #[test]
    fn profile_fills_geometry_unless_overridden() {
        let book = loaded(BookManifest {
            profile: Some("book-6x9".into()),
            margin: Some("2cm".into()),
            ..Default::default()
        });
        let options = book_options(&book, &PublishOptions::default());
        assert_eq!(options.page_size, "6in x 9in");
        assert_eq!(options.margin, "2cm");
        assert!(options.theme_overrides.contains_key("font-body"));

        let publish = PublishOptions {
            page_size: Some("Letter".into()),
            ..Default::default()
        };
        assert_eq!(book_options(&book, &publish).page_size, "Letter");
    }

    #[test]
    fn default_output_path_from_title() {
        let book = loaded(BookManifest {
            title: Some("Field Guide".into()),
            ..Default::default()
        });
        let options = book_options(&book, &PublishOptions::default());
        assert_eq!(options.output_path, Some(PathBuf::from("/books/guide/Field Guide.pdf")));
        assert_eq!(options.header.unwrap().title.as_deref(), Some("Field Guide"));

        let untitled = book_options(&loaded(BookManifest::default()), &PublishOptions::default());
        assert_eq!(untitled.output_path, Some(PathBuf::from("/books/guide/book.pdf")));
    }

    #[test]
    fn manifest_toggles_and_renderer_override() {
        let book = loaded(BookManifest {
            toc: Some(true),
            footnotes: Some(false),
            renderer: Some(RendererKind::Chromium),
            theme_dir: Some("theme".into()),
            ..Default::default()
        });
        let publish = PublishOptions {
            renderer: Some(RendererKind::Lite),
            ..Default::default()
        };
        let options = book_options(&book, &publish);
        assert!(options.toc);
        assert!(!options.footnotes);
        assert_eq!(options.renderer, RendererKind::Lite);
        assert_eq!(options.theme_dir, Some(PathBuf::from("/books/guide/theme")));
    }

    #[test]
    fn title_separators_are_replaced() {
        assert_eq!(output_file_name(Some("A/B")), "A-B.pdf");
        assert_eq!(output_file_name(Some("  ")), "book.pdf");
    }
}
