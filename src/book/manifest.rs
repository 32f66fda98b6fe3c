//! Book manifest: YAML declaring metadata, chapters and conversion settings.
//!
//! ```yaml
//! title: Field Guide
//! author: A. Writer
//! profile: book-6x9
//! toc: true
//! chapters:
//!   - chapters/01-intro.md
//!   - chapters/02-usage.md
//! appendices:
//!   - appendix/glossary.md
//! ```
//!
//! Keys may be written in `snake_case` or `camelCase` (`page_size` or
//! `pageSize`). Every field is type-checked before any chapter is read, and
//! all missing chapter/appendix files are reported together.

use crate::config::RendererKind;
use crate::error::Md2PdfError;
use futures::future::join_all;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const STRING_FIELDS: [&str; 9] = [
    "title",
    "author",
    "profile",
    "theme",
    "theme_dir",
    "theme_file",
    "page_size",
    "margin",
    "renderer",
];
const BOOL_FIELDS: [&str; 8] = [
    "toc",
    "footnotes",
    "mermaid",
    "math",
    "frontmatter",
    "allow_remote",
    "format_code",
    "require_chromium",
];
const LIST_FIELDS: [&str; 2] = ["chapters", "appendices"];
const MAP_FIELDS: [&str; 1] = ["theme_overrides"];

/// A validated book manifest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookManifest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub profile: Option<String>,
    pub theme: Option<String>,
    pub theme_dir: Option<String>,
    pub theme_file: Option<String>,
    pub theme_overrides: BTreeMap<String, String>,
    pub page_size: Option<String>,
    pub margin: Option<String>,
    pub toc: Option<bool>,
    pub footnotes: Option<bool>,
    pub mermaid: Option<bool>,
    pub math: Option<bool>,
    pub frontmatter: Option<bool>,
    pub allow_remote: Option<bool>,
    pub format_code: Option<bool>,
    pub renderer: Option<RendererKind>,
    pub require_chromium: Option<bool>,
    pub chapters: Vec<String>,
    pub appendices: Vec<String>,
}

/// A manifest with its chapter and appendix paths resolved and checked.
#[derive(Debug, Clone)]
pub struct LoadedBook {
    pub manifest: BookManifest,
    /// Absolute manifest path.
    pub path: PathBuf,
    /// Directory containing the manifest; relative paths resolve here.
    pub base_dir: PathBuf,
    pub chapters: Vec<PathBuf>,
    pub appendices: Vec<PathBuf>,
}

/// Read, validate and resolve a manifest.
pub async fn load_manifest(path: impl AsRef<Path>) -> Result<LoadedBook, Md2PdfError> {
    let path = crate::assets::absolutize(path.as_ref());
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| Md2PdfError::from_io(&path, e))?;
    let manifest = parse_manifest(&raw).map_err(|reason| Md2PdfError::InvalidManifest {
        path: path.clone(),
        reason,
    })?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let chapters: Vec<PathBuf> = manifest.chapters.iter().map(|c| base_dir.join(c)).collect();
    let appendices: Vec<PathBuf> = manifest.appendices.iter().map(|a| base_dir.join(a)).collect();

    let missing = missing_files(chapters.iter().chain(&appendices)).await;
    if !missing.is_empty() {
        return Err(Md2PdfError::MissingFiles { paths: missing });
    }
    debug!(
        "Loaded book manifest {}: {} chapters, {} appendices",
        path.display(),
        chapters.len(),
        appendices.len()
    );

    Ok(LoadedBook {
        manifest,
        path,
        base_dir,
        chapters,
        appendices,
    })
}

/// Parse and validate manifest text. Errors are human-readable reasons.
pub fn parse_manifest(raw: &str) -> Result<BookManifest, String> {
    let value: Value = serde_yaml::from_str(raw).map_err(|e| format!("not valid YAML: {e}"))?;
    let mut normalized = normalize_keys(&value)?;
    validate(&normalized)?;
    stringify_overrides(&mut normalized);
    serde_yaml::from_value(Value::Mapping(normalized)).map_err(|e| e.to_string())
}

/// Numeric override values (`body-size: 11`) become strings.
fn stringify_overrides(map: &mut Mapping) {
    if let Some(Value::Mapping(overrides)) = map.get_mut("theme_overrides") {
        for (_, v) in overrides.iter_mut() {
            if let Value::Number(n) = v {
                *v = Value::String(n.to_string());
            }
        }
    }
}

fn normalize_keys(value: &Value) -> Result<Mapping, String> {
    let Value::Mapping(map) = value else {
        return Err("expected a mapping at the top level".into());
    };
    let mut out = Mapping::new();
    for (key, v) in map {
        let Value::String(key) = key else {
            return Err(format!("keys must be strings, got {key:?}"));
        };
        out.insert(Value::String(snake_case(key)), v.clone());
    }
    Ok(out)
}

/// `pageSize` → `page_size`; snake_case keys are unchanged.
pub(crate) fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

fn validate(map: &Mapping) -> Result<(), String> {
    for (key, value) in map {
        let key = key.as_str().unwrap_or_default();
        let ok = if STRING_FIELDS.contains(&key) {
            value.is_string()
        } else if BOOL_FIELDS.contains(&key) {
            value.is_bool()
        } else if LIST_FIELDS.contains(&key) {
            value
                .as_sequence()
                .is_some_and(|items| items.iter().all(Value::is_string))
        } else if MAP_FIELDS.contains(&key) {
            value.as_mapping().is_some_and(|m| {
                m.iter()
                    .all(|(k, v)| k.is_string() && (v.is_string() || v.is_number()))
            })
        } else {
            warn!("Ignoring unknown book manifest field '{}'", key);
            true
        };
        if !ok {
            return Err(format!("field '{key}' must be {}", expected(key)));
        }
    }

    let renderer = map.get("renderer").and_then(Value::as_str);
    if let Some(r) = renderer {
        if r != "chromium" && r != "lite" {
            return Err(format!("field 'renderer' must be 'chromium' or 'lite', got '{r}'"));
        }
    }
    if renderer == Some("lite") && map.get("require_chromium").and_then(Value::as_bool) == Some(true) {
        return Err("require_chromium cannot be combined with renderer: lite".into());
    }

    match map.get("chapters").and_then(Value::as_sequence) {
        Some(chapters) if !chapters.is_empty() => Ok(()),
        _ => Err("chapters must be a non-empty list of file paths".into()),
    }
}

fn expected(key: &str) -> &'static str {
    if STRING_FIELDS.contains(&key) {
        "a string"
    } else if BOOL_FIELDS.contains(&key) {
        "a boolean"
    } else if LIST_FIELDS.contains(&key) {
        "a list of strings"
    } else {
        "a mapping of strings"
    }
}

/// Paths that do not exist, in input order. Checked concurrently.
async fn missing_files<'a>(paths: impl Iterator<Item = &'a PathBuf>) -> Vec<PathBuf> {
    let checks = paths.map(|p| async move {
        match tokio::fs::metadata(p).await {
            Ok(m) if m.is_file() => None,
            _ => Some(p.clone()),
        }
    });
    join_all(checks).await.into_iter().flatten().collect()
}
