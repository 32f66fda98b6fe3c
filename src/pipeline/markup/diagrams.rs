//! ` ```mermaid ` blocks become `<div class="mermaid">source</div>` for the
//! in-page diagram runtime.

use super::dom;
use markup5ever_rcdom::Handle;

pub fn apply(body: &Handle) {
    for pre in dom::find_all(body, |n| dom::is_element(n, "pre")) {
        let Some(code) = pre.children.borrow().iter().find(|c| dom::is_element(c, "code")).cloned() else {
            continue;
        };
        let is_mermaid = dom::get_attr(&code, "class")
            .map(|c| c.split_whitespace().any(|c| c.contains("language-mermaid")))
            .unwrap_or(false);
        if !is_mermaid {
            continue;
        }

        let div = dom::create_element("div", &[("class", "mermaid")]);
        dom::append(&div, dom::create_text(&dom::text_content(&code)));
        dom::replace(&pre, div);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mermaid_code_becomes_container() {
        let tree = dom::parse("<pre><code class=\"language-mermaid\">graph LR\n  A --&gt; B\n</code></pre>").unwrap();
        apply(&tree.body);
        assert_eq!(
            dom::serialize_children(&tree.body).unwrap(),
            "<div class=\"mermaid\">graph LR\n  A --&gt; B\n</div>"
        );
    }

    #[test]
    fn other_code_untouched() {
        let src = "<pre><code class=\"language-python\">print(1)</code></pre>";
        let tree = dom::parse(src).unwrap();
        apply(&tree.body);
        assert_eq!(dom::serialize_children(&tree.body).unwrap(), src);
    }
}
