//! Header and footer template resolution for the browser renderer.
//!
//! For each of header and footer: an explicit template from the options
//! wins, then the theme's template, then a generated default. The generated
//! header shows the document title; the generated footer shows
//! `pageNumber / totalPages` unless page numbers are turned off.

use super::frontmatter::TemplateData;
use super::template::{escape_html, substitute};
use crate::config::HeaderFooterOptions;
use crate::theme::ThemeTemplates;

/// Resolved header/footer markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFooter {
    pub header_template: String,
    pub footer_template: String,
    /// True when either template is non-empty.
    pub display: bool,
}

pub fn build(
    header: Option<&HeaderFooterOptions>,
    footer: Option<&HeaderFooterOptions>,
    theme: &ThemeTemplates,
    data: &TemplateData,
) -> HeaderFooter {
    let header_template = match header.and_then(|h| h.template_html.as_deref()).or(theme.header.as_deref()) {
        Some(t) => substitute(t, data),
        None => {
            let title = header.and_then(|h| h.title.as_deref()).or(data.get("title").map(String::as_str));
            title.map(default_header).unwrap_or_default()
        }
    };

    let footer_template = match footer.and_then(|f| f.template_html.as_deref()).or(theme.footer.as_deref()) {
        Some(t) => substitute(t, data),
        None => {
            let page_numbers = footer.and_then(|f| f.page_numbers).unwrap_or(true);
            if page_numbers {
                default_footer()
            } else {
                String::new()
            }
        }
    };

    let display = !header_template.trim().is_empty() || !footer_template.trim().is_empty();
    HeaderFooter {
        header_template,
        footer_template,
        display,
    }
}

fn default_header(title: &str) -> String {
    base_template(&format!("<div class=\"hf-title\">{}</div>", escape_html(title)))
}

fn default_footer() -> String {
    base_template("<div class=\"hf-page\"><span class=\"pageNumber\"></span> / <span class=\"totalPages\"></span></div>")
}

// Header/footer templates render in their own isolated context, so they
// carry their own styles.
fn base_template(inner: &str) -> String {
    format!(
        "<style>\
.hf-root {{ width: 100%; font-size: 9px; color: #666666; padding: 0 12px; box-sizing: border-box; font-family: \"Noto Sans\", Arial, sans-serif; }}\
.hf-title {{ text-align: left; }}\
.hf-page {{ text-align: right; }}\
</style><div class=\"hf-root\">{inner}</div>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(title: Option<&str>) -> TemplateData {
        title.map(|t| [("title".to_string(), t.to_string())].into()).unwrap_or_default()
    }

    #[test]
    fn defaults_show_title_and_page_numbers() {
        let hf = build(None, None, &ThemeTemplates::default(), &data(Some("Q3 <Report>")));
        assert!(hf.header_template.contains("Q3 &lt;Report&gt;"));
        assert!(hf.footer_template.contains("pageNumber") && hf.footer_template.contains("totalPages"));
        assert!(hf.display);
    }

    #[test]
    fn no_title_and_no_page_numbers_disables_display() {
        let footer = HeaderFooterOptions {
            page_numbers: Some(false),
            ..Default::default()
        };
        let hf = build(None, Some(&footer), &ThemeTemplates::default(), &data(None));
        assert_eq!(hf.header_template, "");
        assert_eq!(hf.footer_template, "");
        assert!(!hf.display);
    }

    #[test]
    fn explicit_template_beats_theme_template() {
        let theme = ThemeTemplates {
            header: Some("<div>theme {{title}}</div>".into()),
            footer: Some("<div>theme footer</div>".into()),
            cover: None,
        };
        let header = HeaderFooterOptions {
            template_html: Some("<div>mine {{title}}</div>".into()),
            ..Default::default()
        };
        let hf = build(Some(&header), None, &theme, &data(Some("A&B")));
        assert_eq!(hf.header_template, "<div>mine A&amp;B</div>");
        assert_eq!(hf.footer_template, "<div>theme footer</div>");
    }

    #[test]
    fn explicit_title_beats_template_data() {
        let header = HeaderFooterOptions {
            title: Some("Explicit".into()),
            ..Default::default()
        };
        let hf = build(Some(&header), None, &ThemeTemplates::default(), &data(Some("Derived")));
        assert!(hf.header_template.contains("Explicit"));
        assert!(!hf.header_template.contains("Derived"));
    }
}
