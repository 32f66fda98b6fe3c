//! Error types for the md2pdf library.
//!
//! A single fatal error type, [`Md2PdfError`], is returned from every public
//! entry point. Its variants follow the failure classes a conversion can hit:
//!
//! * **Configuration**: invalid or contradictory options, unknown theme,
//!   malformed book manifest. Raised before any rendering work starts.
//! * **Input**: missing input, cover, chapter or appendix files. When several
//!   files are checked at once they are reported together.
//! * **Policy**: a remote URL was referenced while remote access is off.
//! * **Renderer**: browser launch failure, timeouts, blocked resources. These
//!   are the only errors the fallback renderer policy recovers from.
//! * **Plugin**: a hook returned an error; the conversion is aborted.
//!
//! Best-effort stages (code formatting, highlight language loading) never
//! produce an error; they degrade to a no-op and log a warning instead.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2pdf library.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Builder or option validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A named theme was requested that is not bundled.
    #[error("Unknown theme: '{name}'\nBundled themes: default. Use a theme file or directory instead.")]
    UnknownTheme { name: String },

    /// The book manifest failed field validation.
    #[error("Invalid book manifest '{path}': {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// An input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// One or more declared chapter/appendix files do not exist.
    #[error("Missing book files:\n{}", format_paths(.paths))]
    MissingFiles { paths: Vec<PathBuf> },

    /// Reading an input file failed for a reason other than absence.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Policy violations ─────────────────────────────────────────────────
    /// A remote asset or image was referenced while remote access is off.
    #[error("Remote assets are disabled: {url}\nPass allow_remote(true) to permit remote resources.")]
    RemoteDisabled { url: String },

    /// The browser attempted to fetch a remote resource and it was blocked.
    #[error("Remote resources blocked: {url}")]
    RemoteBlocked { url: String },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// The browser process could not be started.
    #[error("Failed to launch browser: {0}\nSet CHROME_PATH to a Chrome/Chromium binary or use the lite renderer.")]
    BrowserLaunch(String),

    /// A renderer failed to produce a PDF.
    #[error("Renderer '{renderer}' failed: {reason}")]
    RenderFailed { renderer: String, reason: String },

    /// A renderer operation exceeded the configured timeout.
    #[error("Renderer '{renderer}' timed out after {millis}ms")]
    RenderTimeout { renderer: String, millis: u64 },

    // ── Plugin errors ─────────────────────────────────────────────────────
    /// A plugin hook returned an error.
    #[error("Plugin '{plugin}' failed in {hook}: {message}")]
    Plugin {
        plugin: String,
        hook: &'static str,
        message: String,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Md2PdfError {
    /// Map an I/O error on `path` to `FileNotFound` or `Io`.
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Md2PdfError::FileNotFound { path }
        } else {
            Md2PdfError::Io { path, source }
        }
    }

    /// Whether the renderer fallback policy may recover from this error.
    pub fn is_renderer_failure(&self) -> bool {
        matches!(
            self,
            Md2PdfError::BrowserLaunch(_)
                | Md2PdfError::RenderFailed { .. }
                | Md2PdfError::RenderTimeout { .. }
                | Md2PdfError::RemoteBlocked { .. }
        )
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_lists_every_path() {
        let e = Md2PdfError::MissingFiles {
            paths: vec![PathBuf::from("ch1.md"), PathBuf::from("appendix/a.md")],
        };
        let msg = e.to_string();
        assert!(msg.contains("ch1.md"), "got: {msg}");
        assert!(msg.contains("appendix/a.md"), "got: {msg}");
    }

    #[test]
    fn remote_disabled_names_url() {
        let e = Md2PdfError::RemoteDisabled {
            url: "https://example.com/a.png".into(),
        };
        assert!(e.to_string().contains("https://example.com/a.png"));
    }

    #[test]
    fn not_found_io_maps_to_file_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e = Md2PdfError::from_io("input.md", io);
        assert!(matches!(e, Md2PdfError::FileNotFound { .. }));
    }

    #[test]
    fn renderer_failures_are_recoverable() {
        assert!(Md2PdfError::BrowserLaunch("no chrome".into()).is_renderer_failure());
        assert!(Md2PdfError::RemoteBlocked { url: "http://x".into() }.is_renderer_failure());
        assert!(!Md2PdfError::UnknownTheme { name: "x".into() }.is_renderer_failure());
    }

    #[test]
    fn plugin_error_display() {
        let e = Md2PdfError::Plugin {
            plugin: "stamp".into(),
            hook: "post_render",
            message: "boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("stamp") && msg.contains("post_render") && msg.contains("boom"));
    }
}
