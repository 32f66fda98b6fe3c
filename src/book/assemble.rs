//! Concatenate a book's chapters into one Markdown document.
//!
//! ```text
//! # Title
//!
//! **Author**
//!
//! <!-- section-break -->
//!
//! chapter 1
//!
//! <!-- section-break -->
//!
//! chapter 2
//!
//! <!-- section-break -->
//!
//! # Appendices
//!
//! appendix A
//! ```

use super::manifest::LoadedBook;
use crate::error::Md2PdfError;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};

pub const SECTION_BREAK: &str = "<!-- section-break -->";

/// One chapter or appendix: its file name and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub content: String,
}

/// Read every chapter and appendix, then assemble.
pub async fn assemble_book(book: &LoadedBook) -> Result<String, Md2PdfError> {
    let chapters = read_sections(&book.chapters).await?;
    let appendices = read_sections(&book.appendices).await?;
    Ok(assemble(
        book.manifest.title.as_deref(),
        book.manifest.author.as_deref(),
        &chapters,
        &appendices,
    ))
}

async fn read_sections(paths: &[PathBuf]) -> Result<Vec<Section>, Md2PdfError> {
    try_join_all(paths.iter().map(|p| read_section(p))).await
}

async fn read_section(path: &Path) -> Result<Section, Md2PdfError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Md2PdfError::from_io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Section { name, content })
}

/// Join the preface, chapters and appendices with section breaks.
pub fn assemble(title: Option<&str>, author: Option<&str>, chapters: &[Section], appendices: &[Section]) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = title {
        parts.push(format!("# {title}"));
    }
    if let Some(author) = author {
        parts.push(format!("**{author}**"));
    }
    if title.is_some() || author.is_some() {
        parts.push(SECTION_BREAK.to_string());
    }

    for (i, chapter) in chapters.iter().enumerate() {
        if i > 0 {
            parts.push(SECTION_BREAK.to_string());
        }
        parts.push(normalize(chapter));
    }

    if !appendices.is_empty() {
        parts.push(SECTION_BREAK.to_string());
        parts.push("# Appendices".to_string());
        parts.extend(appendices.iter().map(normalize));
    }

    parts.join("\n\n")
}

/// Trimmed content, or a heading named after the file when empty.
fn normalize(section: &Section) -> String {
    match section.content.trim() {
        "" => format!("# {}", section.name),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn section(name: &str, content: &str) -> Section {
        Section {
            name: name.into(),
            content: content.into(),
        }
    }

    #[test]
    fn two_chapters_separated_by_section_break() {
        let out = assemble(
            None,
            None,
            &[section("a.md", "# One\n\nfirst\n"), section("b.md", "# Two\n")],
            &[],
        );
        assert_eq!(out, "# One\n\nfirst\n\n<!-- section-break -->\n\n# Two");
    }

    #[test]
    fn preface_only_when_present() {
        let out = assemble(Some("Guide"), Some("Ada"), &[section("a.md", "x")], &[]);
        assert_eq!(out, "# Guide\n\n**Ada**\n\n<!-- section-break -->\n\nx");

        let out = assemble(None, Some("Ada"), &[section("a.md", "x")], &[]);
        assert_eq!(out, "**Ada**\n\n<!-- section-break -->\n\nx");
    }

    #[test]
    fn appendices_and_empty_files() {
        let out = assemble(
            None,
            None,
            &[section("intro.md", "  \n")],
            &[section("glossary.md", "terms")],
        );
        assert_eq!(
            out,
            "# intro.md\n\n<!-- section-break -->\n\n# Appendices\n\nterms"
        );
    }
}
