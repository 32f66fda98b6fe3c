//! Asset resolution: normalise image and resource URLs against a base directory
//! and the remote-access policy.
//!
//! `data:` and `file:` URLs pass through. `http(s)` URLs pass through only when
//! remote access is allowed. Everything else is a path relative to the base
//! directory and becomes an absolute `file://` URL.

use crate::error::Md2PdfError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use url::Url;

static RE_REMOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://").unwrap());

/// Where relative URLs resolve from, and whether remote URLs are allowed.
#[derive(Debug, Clone)]
pub struct AssetPolicy {
    pub base_dir: PathBuf,
    pub allow_remote: bool,
}

impl AssetPolicy {
    pub fn new(base_dir: impl Into<PathBuf>, allow_remote: bool) -> Self {
        Self {
            base_dir: base_dir.into(),
            allow_remote,
        }
    }
}

/// Check if the URL is an `http://` or `https://` URL.
pub fn is_remote(url: &str) -> bool {
    RE_REMOTE.is_match(url)
}

/// `data:` and `file:` URLs are used as-is.
pub fn is_passthrough(url: &str) -> bool {
    url.starts_with("data:") || url.starts_with("file:")
}

/// Resolve an asset URL to something the renderer can load.
///
/// Local paths must exist; a missing file is an error.
pub fn resolve_asset(url: &str, policy: &AssetPolicy) -> Result<String, Md2PdfError> {
    if is_remote(url) {
        if !policy.allow_remote {
            return Err(Md2PdfError::RemoteDisabled {
                url: url.to_string(),
            });
        }
        return Ok(url.to_string());
    }

    if is_passthrough(url) {
        return Ok(url.to_string());
    }

    let resolved = resolve_from(&policy.base_dir, url);
    if !resolved.exists() {
        return Err(Md2PdfError::FileNotFound { path: resolved });
    }
    to_file_url(&resolved)
}

/// Join `target` onto `base_dir` unless it is already absolute.
pub fn resolve_from(base_dir: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    let joined = if target.is_absolute() {
        target.to_path_buf()
    } else {
        base_dir.join(target)
    };
    absolutize(&joined)
}

/// Make a path absolute against the current directory without touching the file system.
pub fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Convert an absolute path into a `file://` URL string.
pub fn to_file_url(path: &Path) -> Result<String, Md2PdfError> {
    Url::from_file_path(absolutize(path))
        .map(|u| u.to_string())
        .map_err(|_| Md2PdfError::Internal(format!("cannot express '{}' as a file URL", path.display())))
}
