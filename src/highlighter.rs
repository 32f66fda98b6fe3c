//! Syntax highlighting and the cross-call highlighter cache.
//!
//! Loading syntax definitions and colour themes is the most expensive setup
//! in the pipeline, so compiled highlighters are kept in a [`HighlighterCache`]
//! keyed by the set of theme names a conversion uses. The cache is an
//! explicit object: [`crate::Converter`] owns one, and the free
//! [`crate::convert`] function shares a process-wide instance.

use once_cell::sync::{Lazy, OnceCell};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, FontStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::{debug, warn};

/// syntect theme used for unknown theme names.
const FALLBACK_THEME: &str = "InspiredGitHub";

static GLOBAL_CACHE: Lazy<Arc<HighlighterCache>> = Lazy::new(|| Arc::new(HighlighterCache::new()));

/// The process-wide cache shared by the free conversion functions.
pub fn global_cache() -> Arc<HighlighterCache> {
    Arc::clone(&GLOBAL_CACHE)
}

/// Map user-facing theme names onto bundled syntect themes.
fn syntect_theme_name(name: &str) -> &str {
    match name {
        "github-light" | "github" => "InspiredGitHub",
        "github-dark" => "base16-ocean.dark",
        "solarized-light" => "Solarized (light)",
        "solarized-dark" => "Solarized (dark)",
        "ocean-dark" => "base16-ocean.dark",
        "ocean-light" => "base16-ocean.light",
        "eighties-dark" => "base16-eighties.dark",
        "mocha-dark" => "base16-mocha.dark",
        other => other,
    }
}

/// Compiled highlighters keyed by theme set, built on first use.
#[derive(Default)]
pub struct HighlighterCache {
    syntaxes: OnceCell<Arc<SyntaxSet>>,
    themes: OnceCell<ThemeSet>,
    compiled: Mutex<HashMap<BTreeSet<String>, Arc<Highlighter>>>,
}

impl std::fmt::Debug for HighlighterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlighterCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl HighlighterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlighter that knows every theme in `themes`.
    pub fn get(&self, themes: &BTreeSet<String>) -> Arc<Highlighter> {
        let mut compiled = self.compiled.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(h) = compiled.get(themes) {
            return Arc::clone(h);
        }

        debug!("building highlighter for themes {:?}", themes);
        let syntaxes = Arc::clone(
            self.syntaxes
                .get_or_init(|| Arc::new(SyntaxSet::load_defaults_newlines())),
        );
        let theme_set = self.themes.get_or_init(ThemeSet::load_defaults);

        let mut loaded = HashMap::new();
        for name in themes {
            let theme = match theme_set.themes.get(syntect_theme_name(name)) {
                Some(t) => t.clone(),
                None => {
                    warn!("Unknown code theme '{}', using {}", name, FALLBACK_THEME);
                    theme_set.themes[FALLBACK_THEME].clone()
                }
            };
            loaded.insert(name.clone(), theme);
        }

        let highlighter = Arc::new(Highlighter {
            syntaxes,
            themes: loaded,
            fallback: theme_set.themes[FALLBACK_THEME].clone(),
        });
        compiled.insert(themes.clone(), Arc::clone(&highlighter));
        highlighter
    }

    /// Number of compiled highlighters.
    pub fn len(&self) -> usize {
        self.compiled.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One highlighted run of text with its inline CSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub style: Option<String>,
}

/// Highlighted code block.
#[derive(Debug, Clone)]
pub struct HighlightedCode {
    /// Block style (background and default foreground).
    pub style: Option<String>,
    pub tokens: Vec<Token>,
}

/// Syntax definitions plus the themes of one theme set.
pub struct Highlighter {
    syntaxes: Arc<SyntaxSet>,
    themes: HashMap<String, Theme>,
    fallback: Theme,
}

impl Highlighter {
    fn syntax_for(&self, language: Option<&str>) -> &SyntaxReference {
        language
            .and_then(|lang| {
                self.syntaxes
                    .find_syntax_by_token(lang)
                    .or_else(|| self.syntaxes.find_syntax_by_extension(lang))
            })
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    /// Whether `language` has a syntax definition (otherwise plain text is used).
    pub fn supports(&self, language: &str) -> bool {
        self.syntaxes.find_syntax_by_token(language).is_some()
            || self.syntaxes.find_syntax_by_extension(language).is_some()
    }

    /// Highlight `code` as `language` using the named theme.
    ///
    /// Never fails: an unknown language is plain text, and a highlighting
    /// error leaves the remainder of the block unstyled.
    pub fn highlight(&self, code: &str, language: Option<&str>, theme: &str) -> HighlightedCode {
        let theme = self.themes.get(theme).unwrap_or(&self.fallback);
        let syntax = self.syntax_for(language);
        let mut h = HighlightLines::new(syntax, theme);
        let mut tokens = Vec::new();
        let mut failed = false;

        for line in LinesWithEndings::from(code) {
            if failed {
                tokens.push(Token {
                    text: line.to_string(),
                    style: None,
                });
                continue;
            }
            match h.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => {
                    for (style, text) in ranges {
                        tokens.push(Token {
                            text: text.to_string(),
                            style: Some(token_css(style.foreground, style.font_style)),
                        });
                    }
                }
                Err(e) => {
                    debug!("highlighting failed, continuing as plain text: {}", e);
                    failed = true;
                    tokens.push(Token {
                        text: line.to_string(),
                        style: None,
                    });
                }
            }
        }

        HighlightedCode {
            style: block_css(theme),
            tokens,
        }
    }
}

fn hex(c: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
}

fn token_css(fg: Color, font: FontStyle) -> String {
    let mut css = format!("color:{}", hex(fg));
    if font.intersects(FontStyle::BOLD) {
        css.push_str(";font-weight:bold");
    }
    if font.intersects(FontStyle::ITALIC) {
        css.push_str(";font-style:italic");
    }
    if font.intersects(FontStyle::UNDERLINE) {
        css.push_str(";text-decoration:underline");
    }
    css
}

fn block_css(theme: &Theme) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(bg) = theme.settings.background {
        parts.push(format!("background-color:{}", hex(bg)));
    }
    if let Some(fg) = theme.settings.foreground {
        parts.push(format!("color:{}", hex(fg)));
    }
    (!parts.is_empty()).then(|| parts.join(";"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cache_reuses_highlighter_per_theme_set() {
        let cache = HighlighterCache::new();
        let a = cache.get(&set(&["github-light"]));
        let b = cache.get(&set(&["github-light"]));
        assert!(Arc::ptr_eq(&a, &b));
        let _c = cache.get(&set(&["github-light", "github-dark"]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn highlight_preserves_text() {
        let cache = HighlighterCache::new();
        let h = cache.get(&set(&["github-light"]));
        let code = "fn main() {\n    println!(\"hi\");\n}\n";
        let out = h.highlight(code, Some("rust"), "github-light");
        let joined: String = out.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(joined, code);
        assert!(out.tokens.iter().any(|t| t.style.is_some()));
    }

    #[test]
    fn unknown_language_is_plain_text() {
        let cache = HighlighterCache::new();
        let h = cache.get(&set(&["github-light"]));
        assert!(!h.supports("no-such-language"));
        let out = h.highlight("x = 1\n", Some("no-such-language"), "github-light");
        let joined: String = out.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(joined, "x = 1\n");
    }

    #[test]
    fn unknown_theme_falls_back() {
        let cache = HighlighterCache::new();
        let h = cache.get(&set(&["nope-theme"]));
        let out = h.highlight("let x = 1;\n", Some("rs"), "nope-theme");
        assert!(out.style.is_some());
    }
}
