//! Sentinel paragraphs become `<div class="page-break">` / `<div class="section-break">`.

use super::dom;
use crate::pipeline::document::page_breaks::{PAGE_BREAK_TOKEN, SECTION_BREAK_TOKEN};
use markup5ever_rcdom::Handle;

pub fn apply(body: &Handle) {
    for p in dom::find_all(body, |n| dom::is_element(n, "p")) {
        let class = match dom::text_content(&p).trim() {
            PAGE_BREAK_TOKEN => "page-break",
            SECTION_BREAK_TOKEN => "section-break",
            _ => continue,
        };
        dom::replace(&p, dom::create_element("div", &[("class", class)]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sentinels_become_break_divs() {
        let tree = dom::parse("<p>a</p><p>__MD2PDF_PAGE_BREAK__</p><p>b</p><p>__MD2PDF_SECTION_BREAK__</p>").unwrap();
        apply(&tree.body);
        assert_eq!(
            dom::serialize_children(&tree.body).unwrap(),
            "<p>a</p><div class=\"page-break\"></div><p>b</p><div class=\"section-break\"></div>"
        );
    }

    #[test]
    fn token_inside_longer_text_is_kept() {
        let tree = dom::parse("<p>see __MD2PDF_PAGE_BREAK__ here</p>").unwrap();
        apply(&tree.body);
        assert!(dom::serialize_children(&tree.body).unwrap().starts_with("<p>"));
    }
}
