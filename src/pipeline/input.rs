//! Input resolution: turn a [`ConversionRequest`] into Markdown text, the
//! base directory relative assets resolve against, and a derived title.
//!
//! A missing input file fails here, before any transform runs.

use crate::assets::absolutize;
use crate::error::Md2PdfError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionRequest {
    /// A Markdown file; assets resolve against its directory.
    File(PathBuf),
    /// Raw Markdown; assets resolve against `base_dir` (default: working directory).
    Text {
        markdown: String,
        base_dir: Option<PathBuf>,
    },
}

impl ConversionRequest {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        ConversionRequest::File(path.into())
    }

    pub fn text(markdown: impl Into<String>) -> Self {
        ConversionRequest::Text {
            markdown: markdown.into(),
            base_dir: None,
        }
    }

    pub fn text_in(markdown: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        ConversionRequest::Text {
            markdown: markdown.into(),
            base_dir: Some(base_dir.into()),
        }
    }
}

impl From<&Path> for ConversionRequest {
    fn from(path: &Path) -> Self {
        ConversionRequest::File(path.to_path_buf())
    }
}

impl From<PathBuf> for ConversionRequest {
    fn from(path: PathBuf) -> Self {
        ConversionRequest::File(path)
    }
}

/// A request resolved to text.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub markdown: String,
    /// Absolute directory for relative asset resolution.
    pub base_dir: PathBuf,
    /// File name without extension, for file requests.
    pub derived_title: Option<String>,
}

pub async fn resolve_input(request: &ConversionRequest) -> Result<ResolvedInput, Md2PdfError> {
    match request {
        ConversionRequest::File(path) => {
            let markdown = read_markdown(path).await?;
            let path = absolutize(path);
            let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
            let derived_title = path.file_stem().map(|s| s.to_string_lossy().into_owned());
            debug!("Resolved input file: {}", path.display());
            Ok(ResolvedInput {
                markdown,
                base_dir,
                derived_title,
            })
        }
        ConversionRequest::Text { markdown, base_dir } => {
            let base_dir = match base_dir {
                Some(dir) => absolutize(dir),
                None => std::env::current_dir().map_err(|e| Md2PdfError::Internal(format!("working directory: {e}")))?,
            };
            Ok(ResolvedInput {
                markdown: markdown.clone(),
                base_dir,
                derived_title: None,
            })
        }
    }
}

/// Read a Markdown file, mapping absence to `FileNotFound`.
pub async fn read_markdown(path: &Path) -> Result<String, Md2PdfError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Md2PdfError::from_io(path, e))
}
