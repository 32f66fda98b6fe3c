//! Markup-tree transform chain over the html5ever `RcDom`.
//!
//! Runs after the document tree has been rendered to HTML and re-parsed:
//!
//! ```text
//! headings ─▶ page_breaks ─▶ diagrams ─▶ images ─▶ highlight ─▶ math ─▶ [user transforms]
//! ```
//!
//! Diagram extraction runs before highlighting so diagram sources are never
//! coloured. Image resolution is the only stage that can fail the document.

pub mod diagrams;
pub mod dom;
pub mod headings;
pub mod highlight;
pub mod images;
pub mod math;
pub mod page_breaks;

use crate::assets::AssetPolicy;
use crate::error::Md2PdfError;
use crate::highlighter::Highlighter;
use markup5ever_rcdom::Handle;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One mutation of the markup tree, applied to the `<body>` element.
///
/// User-supplied transforms are appended after the built-in chain.
pub trait MarkupTransform: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, body: &Handle, ctx: &MarkupContext) -> Result<(), Md2PdfError>;
}

/// What the markup stages need from the conversion.
pub struct MarkupContext {
    pub assets: AssetPolicy,
    pub mermaid: bool,
    pub math: bool,
    pub code_theme: String,
    pub code_theme_by_language: BTreeMap<String, String>,
    pub highlighter: Arc<Highlighter>,
}

impl MarkupContext {
    /// Theme for `language`: the per-language override or the global theme.
    pub fn theme_for(&self, language: Option<&str>) -> &str {
        language
            .and_then(|l| self.code_theme_by_language.get(l))
            .map(String::as_str)
            .unwrap_or(&self.code_theme)
    }
}

/// Every theme name a conversion can ask the highlighter for.
pub fn theme_set(code_theme: &str, by_language: &BTreeMap<String, String>) -> BTreeSet<String> {
    std::iter::once(code_theme.to_string())
        .chain(by_language.values().cloned())
        .collect()
}

/// Run the built-in chain, then `extra` in list order.
pub fn run_chain(body: &Handle, ctx: &MarkupContext, extra: &[Arc<dyn MarkupTransform>]) -> Result<(), Md2PdfError> {
    headings::apply(body);
    page_breaks::apply(body);
    if ctx.mermaid {
        diagrams::apply(body);
    }
    images::apply(body, &ctx.assets)?;
    highlight::apply(body, ctx);
    if ctx.math {
        math::apply(body);
    }
    for transform in extra {
        tracing::debug!("markup transform: {}", transform.name());
        transform.apply(body, ctx)?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_language_theme_overrides_global() {
        let mut by_language = BTreeMap::new();
        by_language.insert("rust".to_string(), "github-dark".to_string());
        let mut ctx = test_support::context(std::path::Path::new("."));
        ctx.code_theme_by_language = by_language.clone();
        assert_eq!(ctx.theme_for(Some("rust")), "github-dark");
        assert_eq!(ctx.theme_for(Some("python")), "github-light");
        assert_eq!(ctx.theme_for(None), "github-light");

        let themes = theme_set("github-light", &by_language);
        assert_eq!(themes.len(), 2);
    }

    #[test]
    fn chain_order_keeps_diagrams_unhighlighted() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_support::context(dir.path());
        let tree = dom::parse(
            "<pre><code class=\"language-mermaid\">graph TD; A--&gt;B</code></pre>\
             <pre><code class=\"language-rust\">let x = 1;</code></pre>",
        )
        .unwrap();
        run_chain(&tree.body, &ctx, &[]).unwrap();
        let html = dom::serialize_children(&tree.body).unwrap();
        assert!(html.starts_with("<div class=\"mermaid\">graph TD; A--&gt;B</div>"), "got: {html}");
        assert!(html.contains("<span style=\"color:"), "got: {html}");
    }
}
