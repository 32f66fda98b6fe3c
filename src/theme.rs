//! Theme loading: CSS plus optional header/footer/cover templates.
//!
//! Precedence is theme directory, then theme file, then bundled theme name.
//!
//! ```text
//! my-theme/
//! ├── theme.css            required
//! ├── fonts/               optional, substituted for __FONT_DIR__
//! └── templates/           optional
//!     ├── header.html
//!     ├── footer.html
//!     └── cover.html
//! ```

use crate::assets::{absolutize, to_file_url};
use crate::config::ConversionOptions;
use crate::error::Md2PdfError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CSS: &str = include_str!("../themes/default.css");
const FONT_DIR_PLACEHOLDER: &str = "__FONT_DIR__";

/// Where a theme comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeSource {
    Dir(PathBuf),
    File(PathBuf),
    Named(String),
}

impl ThemeSource {
    /// Pick the source with the highest precedence the options set.
    pub fn from_options(options: &ConversionOptions) -> Self {
        if let Some(ref dir) = options.theme_dir {
            ThemeSource::Dir(dir.clone())
        } else if let Some(ref file) = options.theme_file {
            ThemeSource::File(file.clone())
        } else {
            ThemeSource::Named(options.theme.clone())
        }
    }
}

/// Optional theme-provided templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeTemplates {
    pub header: Option<String>,
    pub footer: Option<String>,
    pub cover: Option<String>,
}

/// A loaded theme.
#[derive(Debug, Clone, Default)]
pub struct ThemeResult {
    pub css: String,
    pub templates: ThemeTemplates,
}

/// Load a theme and apply font-path substitution and variable overrides.
pub async fn load_theme(source: &ThemeSource, overrides: &BTreeMap<String, String>) -> Result<ThemeResult, Md2PdfError> {
    let (css, font_root, template_dir) = match source {
        ThemeSource::Dir(dir) => {
            let dir = absolutize(dir);
            let css = read_required(&dir.join("theme.css")).await?;
            (css, Some(dir.clone()), Some(dir.join("templates")))
        }
        ThemeSource::File(file) => {
            let file = absolutize(file);
            let css = read_required(&file).await?;
            (css, file.parent().map(Path::to_path_buf), None)
        }
        ThemeSource::Named(name) if name == "default" => (DEFAULT_CSS.to_string(), None, None),
        ThemeSource::Named(name) => return Err(Md2PdfError::UnknownTheme { name: name.clone() }),
    };
    debug!("theme loaded from {:?}", source);

    let font_url = match font_root.map(|r| r.join("fonts")) {
        Some(fonts) if tokio::fs::metadata(&fonts).await.is_ok_and(|m| m.is_dir()) => to_file_url(&fonts)?,
        _ => String::new(),
    };
    let css = apply_overrides(css.replace(FONT_DIR_PLACEHOLDER, &font_url), overrides);

    let templates = match template_dir {
        Some(dir) => ThemeTemplates {
            header: read_optional(&dir.join("header.html")).await,
            footer: read_optional(&dir.join("footer.html")).await,
            cover: read_optional(&dir.join("cover.html")).await,
        },
        None => ThemeTemplates::default(),
    };

    Ok(ThemeResult { css, templates })
}

/// Append overrides as a trailing `:root { --key: value; }` block.
fn apply_overrides(css: String, overrides: &BTreeMap<String, String>) -> String {
    if overrides.is_empty() {
        return css;
    }
    let vars = overrides
        .iter()
        .map(|(k, v)| {
            let name = if k.starts_with("--") { k.clone() } else { format!("--{k}") };
            format!("{name}: {v};")
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{css}\n:root {{ {vars} }}\n")
}

async fn read_required(path: &Path) -> Result<String, Md2PdfError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Md2PdfError::from_io(path, e))
}

async fn read_optional(path: &Path) -> Option<String> {
    tokio::fs::read_to_string(path).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_theme_is_bundled() {
        let theme = load_theme(&ThemeSource::Named("default".into()), &BTreeMap::new())
            .await
            .unwrap();
        assert!(theme.css.contains(".page-break"));
        assert!(!theme.css.contains(FONT_DIR_PLACEHOLDER));
        assert_eq!(theme.templates, ThemeTemplates::default());
    }

    #[tokio::test]
    async fn unknown_named_theme_fails() {
        let err = load_theme(&ThemeSource::Named("neon".into()), &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::UnknownTheme { ref name } if name == "neon"));
    }

    #[tokio::test]
    async fn theme_dir_with_fonts_and_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("theme.css"),
            "@font-face { src: url(__FONT_DIR__/Inter.woff2); }",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("fonts")).unwrap();
        std::fs::create_dir(dir.path().join("templates")).unwrap();
        std::fs::write(dir.path().join("templates/footer.html"), "<div>{{title}}</div>").unwrap();

        let theme = load_theme(&ThemeSource::Dir(dir.path().into()), &BTreeMap::new())
            .await
            .unwrap();
        assert!(theme.css.contains("url(file://"), "got: {}", theme.css);
        assert!(theme.css.contains("/fonts/Inter.woff2"));
        assert_eq!(theme.templates.footer.as_deref(), Some("<div>{{title}}</div>"));
        assert!(theme.templates.header.is_none());
    }

    #[tokio::test]
    async fn theme_file_without_fonts_gets_empty_font_dir() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("print.css");
        std::fs::write(&css, "src: url(__FONT_DIR__/x.ttf);").unwrap();
        let theme = load_theme(&ThemeSource::File(css), &BTreeMap::new()).await.unwrap();
        assert_eq!(theme.css, "src: url(/x.ttf);");
    }

    #[tokio::test]
    async fn overrides_appended_as_root_block() {
        let mut overrides = BTreeMap::new();
        overrides.insert("accent".to_string(), "#c00".to_string());
        overrides.insert("--body-size".to_string(), "11pt".to_string());
        let theme = load_theme(&ThemeSource::Named("default".into()), &overrides)
            .await
            .unwrap();
        assert!(theme.css.ends_with(":root { --body-size: 11pt; --accent: #c00; }\n"), "got: {}", theme.css);
    }

    #[tokio::test]
    async fn missing_theme_file_is_not_found() {
        let err = load_theme(&ThemeSource::File("/nonexistent/theme.css".into()), &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::FileNotFound { .. }));
    }

    #[test]
    fn source_precedence() {
        let o = ConversionOptions::builder()
            .theme("default")
            .theme_file("a.css")
            .theme_dir("dir")
            .build()
            .unwrap();
        assert_eq!(ThemeSource::from_options(&o), ThemeSource::Dir("dir".into()));
    }
}
