//! `@ref(id)` cross references become links to `#id`.

use super::new_node;
use comrak::nodes::{AstNode, NodeLink, NodeValue};
use comrak::Arena;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"@ref\(([^)]+)\)").unwrap());

pub fn apply<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) {
    merge_adjacent_text(root);

    let candidates: Vec<&'a AstNode<'a>> = root
        .descendants()
        .filter(|node| match &node.data.borrow().value {
            NodeValue::Text(text) => RE_REF.is_match(text),
            _ => false,
        })
        .filter(|node| !inside_link(node))
        .collect();

    for node in candidates {
        let text = match &node.data.borrow().value {
            NodeValue::Text(text) => text.clone(),
            _ => continue,
        };

        let mut last = 0;
        for caps in RE_REF.captures_iter(&text) {
            let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                node.insert_before(new_node(arena, NodeValue::Text(text[last..whole.start()].to_string())));
            }
            let id = id.as_str().trim();
            let link = new_node(
                arena,
                NodeValue::Link(NodeLink {
                    url: format!("#{id}"),
                    title: String::new(),
                }),
            );
            link.append(new_node(arena, NodeValue::Text(id.to_string())));
            node.insert_before(link);
            last = whole.end();
        }
        if last < text.len() {
            node.insert_before(new_node(arena, NodeValue::Text(text[last..].to_string())));
        }
        node.detach();
    }
}

fn inside_link<'a>(node: &'a AstNode<'a>) -> bool {
    node.ancestors()
        .any(|a| matches!(a.data.borrow().value, NodeValue::Link(_) | NodeValue::Image(_)))
}

/// The inline parser may split a run of text at special characters; join
/// neighbouring text nodes so a reference is matched as a whole.
fn merge_adjacent_text<'a>(root: &'a AstNode<'a>) {
    let texts: Vec<&'a AstNode<'a>> = root
        .descendants()
        .filter(|n| matches!(n.data.borrow().value, NodeValue::Text(_)))
        .collect();

    for node in texts {
        // Already merged into a previous sibling.
        if node.parent().is_none() {
            continue;
        }
        while let Some(next) = node.next_sibling() {
            let next_text = match &next.data.borrow().value {
                NodeValue::Text(t) => t.clone(),
                _ => break,
            };
            if let NodeValue::Text(ref mut t) = node.data.borrow_mut().value {
                t.push_str(&next_text);
            }
            next.detach();
        }
    }
}
