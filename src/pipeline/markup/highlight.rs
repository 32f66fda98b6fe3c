//! Syntax highlighting of `<pre><code>` blocks with inline styles.
//!
//! Blocks are highlighted in parallel and each result replaces its own
//! `<pre>`. Unknown languages render as plain text with the theme colours.

use super::{dom, MarkupContext};
use crate::formatters::normalize_language;
use crate::highlighter::HighlightedCode;
use markup5ever_rcdom::Handle;
use rayon::prelude::*;

struct Job {
    language: Option<String>,
    code: String,
    theme: String,
}

fn code_language(code: &Handle) -> Option<String> {
    dom::get_attr(code, "class")?
        .split_whitespace()
        .find_map(|c| c.strip_prefix("language-"))
        .and_then(normalize_language)
}

pub fn apply(body: &Handle, ctx: &MarkupContext) {
    let mut targets = Vec::new();
    let mut jobs = Vec::new();

    for pre in dom::find_all(body, |n| dom::is_element(n, "pre")) {
        let Some(code) = pre.children.borrow().iter().find(|c| dom::is_element(c, "code")).cloned() else {
            continue;
        };
        let language = code_language(&code);
        let theme = ctx.theme_for(language.as_deref()).to_string();
        jobs.push(Job {
            code: dom::text_content(&code),
            language,
            theme,
        });
        targets.push(pre);
    }

    if jobs.is_empty() {
        return;
    }

    let highlighter = &ctx.highlighter;
    let results: Vec<HighlightedCode> = jobs
        .par_iter()
        .map(|job| highlighter.highlight(&job.code, job.language.as_deref(), &job.theme))
        .collect();

    for ((pre, job), highlighted) in targets.iter().zip(&jobs).zip(results) {
        dom::replace(pre, build_block(job, highlighted));
    }
}

fn build_block(job: &Job, highlighted: HighlightedCode) -> Handle {
    let mut pre_attrs = vec![("class", "highlight")];
    if let Some(ref style) = highlighted.style {
        pre_attrs.push(("style", style.as_str()));
    }
    let pre = dom::create_element("pre", &pre_attrs);

    let class = job.language.as_ref().map(|l| format!("language-{l}"));
    let code = match class {
        Some(ref c) => dom::create_element("code", &[("class", c.as_str())]),
        None => dom::create_element("code", &[]),
    };

    for token in highlighted.tokens {
        let node = match token.style {
            Some(ref style) => {
                let span = dom::create_element("span", &[("style", style.as_str())]);
                dom::append(&span, dom::create_text(&token.text));
                span
            }
            None => dom::create_text(&token.text),
        };
        dom::append(&code, node);
    }
    dom::append(&pre, code);
    pre
}

#[cfg(test)]
mod tests {
    use super::super::test_support::context;
    use super::*;

    #[test]
    fn rust_block_gets_spans_and_keeps_text() {
        let ctx = context(std::path::Path::new("."));
        let tree = dom::parse("<pre><code class=\"language-Rust\">fn main() {}\n</code></pre>").unwrap();
        apply(&tree.body, &ctx);
        let html = dom::serialize_children(&tree.body).unwrap();
        assert!(html.starts_with("<pre class=\"highlight\""), "got: {html}");
        assert!(html.contains("class=\"language-rust\""), "got: {html}");
        assert!(html.contains("<span style=\"color:#"), "got: {html}");
        assert_eq!(dom::text_content(&tree.body), "fn main() {}\n");
    }

    #[test]
    fn block_without_language_is_plain() {
        let ctx = context(std::path::Path::new("."));
        let tree = dom::parse("<pre><code>a &lt; b\n</code></pre>").unwrap();
        apply(&tree.body, &ctx);
        assert_eq!(dom::text_content(&tree.body), "a < b\n");
    }

    #[test]
    fn no_code_blocks_is_noop() {
        let ctx = context(std::path::Path::new("."));
        let tree = dom::parse("<p>text</p>").unwrap();
        apply(&tree.body, &ctx);
        assert_eq!(dom::serialize_children(&tree.body).unwrap(), "<p>text</p>");
    }
}
