//! Table of contents generation.
//!
//! Runs only when the document has a marker heading whose text is
//! `Contents`, `Content`, `Table of contents`, `Table-of-content` or `TOC`
//! (case-insensitive, top level). Whatever sits between the marker and the
//! next heading of the same or a higher level is replaced by the list, which
//! covers the headings from that point on. Without a marker, or without a
//! heading after it, the document is left alone.
//!
//! Link targets use the same slugger and the same heading text as the
//! anchors emitted by the markup chain.

use super::inline_text;
use crate::pipeline::slug::Slugger;
use comrak::nodes::{AstNode, NodeValue};
use comrak::{parse_document, Arena, Options};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_TOC_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(table[ -]of[ -])?contents?$|^toc$").unwrap());

struct Entry {
    level: u8,
    text: String,
    slug: String,
}

pub fn apply<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) {
    let mut slugger = Slugger::new();
    let mut marker: Option<(&'a AstNode<'a>, u8)> = None;
    let mut closing: Option<&'a AstNode<'a>> = None;
    let mut entries = Vec::new();

    for node in root.descendants() {
        let level = match node.data.borrow().value {
            NodeValue::Heading(ref h) => h.level,
            _ => continue,
        };
        let text = inline_text(node);
        let top_level = node.parent().is_some_and(|p| p.same_node(root));

        match (marker, closing) {
            (None, _) => {
                slugger.slug(&text);
                if top_level && RE_TOC_HEADING.is_match(text.trim()) {
                    marker = Some((node, level));
                }
            }
            (Some((_, depth)), None) => {
                // Headings inside the replaced section disappear with it.
                if !(top_level && level <= depth) {
                    continue;
                }
                closing = Some(node);
                push_entry(&mut entries, &mut slugger, level, text);
            }
            (Some(_), Some(_)) => push_entry(&mut entries, &mut slugger, level, text),
        }
    }

    let (Some((heading, _)), Some(end)) = (marker, closing) else {
        return;
    };

    let stale: Vec<_> = heading
        .following_siblings()
        .skip(1)
        .take_while(|n| !n.same_node(end))
        .collect();
    for node in stale {
        node.detach();
    }

    if entries.is_empty() {
        return;
    }
    let list_md = render_list(&entries);
    let toc_root = parse_document(arena, &list_md, &Options::default());
    let nodes: Vec<_> = toc_root.children().collect();
    let mut anchor = heading;
    for node in nodes {
        node.detach();
        anchor.insert_after(node);
        anchor = node;
    }
}

fn push_entry(entries: &mut Vec<Entry>, slugger: &mut Slugger, level: u8, text: String) {
    let slug = slugger.slug(&text);
    if !text.trim().is_empty() {
        entries.push(Entry { level, text, slug });
    }
}

fn render_list(entries: &[Entry]) -> String {
    let min = entries.iter().map(|e| e.level).min().unwrap_or(1);
    let mut out = String::new();
    for e in entries {
        let indent = "  ".repeat(usize::from(e.level - min));
        out.push_str(&format!("{indent}- [{}](#{})\n", escape_link_text(&e.text), e.slug));
    }
    out
}

fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '\\' | '*' | '_' | '`' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
