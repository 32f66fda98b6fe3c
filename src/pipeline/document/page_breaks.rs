//! `<!-- page-break -->` / `<!-- section-break -->` markers.
//!
//! Raw HTML is not rendered, so the comment is swapped for a paragraph that
//! carries a sentinel token. The markup chain turns that paragraph into a
//! `div.page-break` / `div.section-break`.

use super::new_node;
use comrak::nodes::{AstNode, NodeValue};
use comrak::Arena;

pub const PAGE_BREAK_TOKEN: &str = "__MD2PDF_PAGE_BREAK__";
pub const SECTION_BREAK_TOKEN: &str = "__MD2PDF_SECTION_BREAK__";

fn token_for(html: &str) -> Option<&'static str> {
    match html.trim() {
        "<!-- page-break -->" => Some(PAGE_BREAK_TOKEN),
        "<!-- section-break -->" => Some(SECTION_BREAK_TOKEN),
        _ => None,
    }
}

pub fn apply<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) {
    let markers: Vec<(&'a AstNode<'a>, &'static str)> = root
        .descendants()
        .filter_map(|node| {
            let token = match &node.data.borrow().value {
                NodeValue::HtmlBlock(block) => token_for(&block.literal),
                // A marker inline in its own paragraph.
                NodeValue::Paragraph => sole_inline_token(node),
                _ => None,
            }?;
            Some((node, token))
        })
        .collect();

    for (node, token) in markers {
        let paragraph = new_node(arena, NodeValue::Paragraph);
        paragraph.append(new_node(arena, NodeValue::Text(token.to_string())));
        node.insert_before(paragraph);
        node.detach();
    }
}

fn sole_inline_token<'a>(paragraph: &'a AstNode<'a>) -> Option<&'static str> {
    let mut children = paragraph.children();
    let first = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match &first.data.borrow().value {
        NodeValue::HtmlInline(html) => token_for(html),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{parse, render};
    use super::*;

    #[test]
    fn markers_become_sentinel_paragraphs() {
        let arena = Arena::new();
        let root = parse(&arena, "One\n\n<!-- page-break -->\n\nTwo\n\n<!-- section-break -->\n\nThree\n");
        apply(&arena, root);
        let html = render(root);
        assert_eq!(
            html,
            "<p>One</p>\n<p>__MD2PDF_PAGE_BREAK__</p>\n<p>Two</p>\n<p>__MD2PDF_SECTION_BREAK__</p>\n<p>Three</p>\n"
        );
    }

    #[test]
    fn other_comments_are_untouched() {
        let arena = Arena::new();
        let root = parse(&arena, "<!-- note -->\n\nText\n");
        apply(&arena, root);
        assert!(!render(root).contains("__MD2PDF"));
    }
}
