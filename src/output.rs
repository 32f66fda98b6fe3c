//! Conversion output types and the final write step.

use crate::error::Md2PdfError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The PDF, either in memory or written to disk. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfOutput {
    Bytes(Vec<u8>),
    Written(PathBuf),
}

/// Timing and renderer details for one conversion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    /// Renderer that produced the PDF.
    pub renderer: String,
    /// Primary renderer error when the fallback was used.
    pub fallback_reason: Option<String>,
    pub pdf_bytes: usize,
    pub markdown_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub output: PdfOutput,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// In-memory PDF bytes, if the output was not written to a file.
    pub fn pdf(&self) -> Option<&[u8]> {
        match self.output {
            PdfOutput::Bytes(ref b) => Some(b),
            PdfOutput::Written(_) => None,
        }
    }

    /// Written file path, if an output path was given.
    pub fn path(&self) -> Option<&Path> {
        match self.output {
            PdfOutput::Written(ref p) => Some(p),
            PdfOutput::Bytes(_) => None,
        }
    }

    pub fn into_pdf(self) -> Option<Vec<u8>> {
        match self.output {
            PdfOutput::Bytes(b) => Some(b),
            PdfOutput::Written(_) => None,
        }
    }
}

/// Write `bytes` to `path`, creating parent directories.
///
/// Atomic write: temp file next to the target, then rename, so a failed
/// write never leaves a partial PDF at `path`.
pub async fn write_pdf(path: &Path, bytes: &[u8]) -> Result<(), Md2PdfError> {
    let failed = |source| Md2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(failed(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(failed(e));
    }
    Ok(())
}
