//! Heading ids and self-links: `<h2 id="usage"><a href="#usage">Usage</a></h2>`.
//!
//! Slugs come from the same text the TOC pass reads off the document tree:
//! image alt text counts, footnote reference numbers do not. Headings that
//! already contain a link keep their content as is and only get the id.

use super::dom;
use crate::pipeline::slug::Slugger;
use markup5ever_rcdom::{Handle, NodeData};

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

pub fn apply(body: &Handle) {
    let mut slugger = Slugger::new();
    let headings = dom::find_all(body, |n| dom::tag_name(n).is_some_and(|t| HEADINGS.contains(&t)));

    for heading in headings {
        let slug = slugger.slug(&heading_text(&heading));
        let id = match dom::get_attr(&heading, "id") {
            Some(existing) => existing,
            None => {
                dom::set_attr(&heading, "id", &slug);
                slug
            }
        };

        // Nested anchors are invalid HTML.
        if !dom::find_all(&heading, |n| dom::is_element(n, "a")).is_empty() {
            continue;
        }
        let link = dom::create_element("a", &[("href", &format!("#{id}"))]);
        dom::move_children(&heading, &link);
        dom::append(&heading, link);
    }
}

/// Text a heading is slugged by.
fn heading_text(heading: &Handle) -> String {
    let mut out = String::new();
    collect_heading_text(heading, &mut out);
    out
}

fn collect_heading_text(node: &Handle, out: &mut String) {
    match node.data {
        NodeData::Text { ref contents } => out.push_str(&contents.borrow().replace('\n', " ")),
        NodeData::Element { .. } if dom::is_element(node, "img") => {
            out.push_str(&dom::get_attr(node, "alt").unwrap_or_default());
        }
        NodeData::Element { .. } if dom::is_element(node, "sup") && dom::has_class(node, "footnote-ref") => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_heading_text(child, out);
            }
        }
    }
}
