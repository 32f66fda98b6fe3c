//! HTML document assembly and `{{key}}` placeholder substitution.

use super::frontmatter::TemplateData;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*([\w.-]+)\s*\}\}").unwrap());

/// Built-in stylesheet for MathML output when no math stylesheet is linked.
pub const MATH_CSS: &str = "math { font-family: \"Latin Modern Math\", \"STIX Two Math\", \"Cambria Math\", serif; }\n\
math[display=\"block\"] { display: block; margin: 0.6em auto; }";

/// How the diagram runtime gets into the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramScript {
    /// Script source embedded in the document.
    Inline(String),
    /// Script loaded from a URL.
    Src(String),
}

/// Everything that goes into the final document.
#[derive(Debug, Default)]
pub struct DocumentParts<'a> {
    pub body_html: &'a str,
    /// Cover markup, already wrapped (section + page break, or theme template).
    pub cover_html: Option<&'a str>,
    pub theme_css: &'a str,
    pub math_css_href: Option<&'a str>,
    pub math_css: Option<&'a str>,
    pub script: Option<&'a DiagramScript>,
    pub title: Option<&'a str>,
}

pub fn build_html_document(parts: &DocumentParts<'_>) -> String {
    let mut head = String::new();
    head.push_str("  <meta charset=\"utf-8\" />\n");
    head.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
    if let Some(title) = parts.title {
        head.push_str(&format!("  <title>{}</title>\n", escape_html(title)));
    }
    head.push_str(&format!("  <style>{}</style>\n", parts.theme_css));
    if let Some(href) = parts.math_css_href {
        head.push_str(&format!("  <link rel=\"stylesheet\" href=\"{}\">\n", escape_html(href)));
    }
    if let Some(css) = parts.math_css {
        head.push_str(&format!("  <style>{css}</style>\n"));
    }

    let script = match parts.script {
        Some(DiagramScript::Inline(js)) => format!("<script>{js}</script>"),
        Some(DiagramScript::Src(src)) => format!("<script src=\"{}\"></script>", escape_html(src)),
        None => String::new(),
    };

    format!(
        "<!doctype html>\n<html>\n<head>\n{head}</head>\n<body>\n  {cover}\n  <main class=\"content\">{body}</main>\n  {script}\n</body>\n</html>",
        cover = parts.cover_html.unwrap_or(""),
        body = parts.body_html,
    )
}

/// Wrap cover markup: the theme cover template when present, otherwise a
/// `section.cover` followed by a page break.
pub fn apply_cover_template(cover_html: &str, template: Option<&str>, data: &TemplateData) -> String {
    match template {
        None => format!("<section class=\"cover\">{cover_html}</section><div class=\"page-break\"></div>"),
        Some(template) => RE_PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                if &caps[1] == "content" {
                    cover_html.to_string()
                } else {
                    data.get(&caps[1]).map(|v| escape_html(v)).unwrap_or_default()
                }
            })
            .into_owned(),
    }
}

/// Replace `{{key}}` with HTML-escaped template data; unknown keys become empty.
pub fn substitute(template: &str, data: &TemplateData) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            data.get(&caps[1]).map(|v| escape_html(v)).unwrap_or_default()
        })
        .into_owned()
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data(pairs: &[(&str, &str)]) -> TemplateData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn document_contains_all_parts_in_order() {
        let script = DiagramScript::Inline("window.mermaid = {};".into());
        let html = build_html_document(&DocumentParts {
            body_html: "<p>body</p>",
            cover_html: Some("<section class=\"cover\">c</section>"),
            theme_css: "body{}",
            math_css_href: Some("file:///m.css"),
            script: Some(&script),
            ..Default::default()
        });
        let style = html.find("<style>body{}</style>").unwrap();
        let link = html.find("href=\"file:///m.css\"").unwrap();
        let cover = html.find("class=\"cover\"").unwrap();
        let main = html.find("<main class=\"content\"><p>body</p></main>").unwrap();
        let js = html.find("<script>window.mermaid").unwrap();
        assert!(style < link && link < cover && cover < main && main < js);
    }

    #[test]
    fn placeholders_are_escaped_and_missing_keys_empty() {
        let out = substitute("<b>{{ title }}</b>|{{missing}}|", &data(&[("title", "A & <B>")]));
        assert_eq!(out, "<b>A &amp; &lt;B&gt;</b>||");
    }

    #[test]
    fn cover_without_template_gets_section_and_break() {
        assert_eq!(
            apply_cover_template("<h1>T</h1>", None, &TemplateData::new()),
            "<section class=\"cover\"><h1>T</h1></section><div class=\"page-break\"></div>"
        );
    }

    #[test]
    fn cover_template_substitutes_content_unescaped() {
        let out = apply_cover_template(
            "<h1>T</h1>",
            Some("<div class=\"c\">{{content}}<p>{{author}}</p></div>"),
            &data(&[("author", "Ada")]),
        );
        assert_eq!(out, "<div class=\"c\"><h1>T</h1><p>Ada</p></div>");
    }
}
