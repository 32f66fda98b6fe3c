//! Small helpers over the html5ever `RcDom` used by the markup-tree chain.
//!
//! The markup chain parses the rendered HTML once, mutates the `<body>`
//! subtree in place, and serialises the body's children back to a string.

use crate::error::Md2PdfError;
use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{ns, parse_document, serialize, Attribute, LocalName, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A parsed document and its `<body>` element.
///
/// The `RcDom` must outlive the body handle: dropping a node empties the
/// child lists of its whole subtree.
pub struct MarkupTree {
    _dom: RcDom,
    pub body: Handle,
}

/// Parse an HTML fragment into a full document tree.
pub fn parse(html: &str) -> Result<MarkupTree, Md2PdfError> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let body = find_element(&dom.document, "body")
        .ok_or_else(|| Md2PdfError::Internal("parsed markup has no body".into()))?;
    Ok(MarkupTree { _dom: dom, body })
}

/// Parse an HTML fragment into detached top-level nodes.
pub fn parse_nodes(html: &str) -> Result<Vec<Handle>, Md2PdfError> {
    let tree = parse(html)?;
    let children: Vec<Handle> = tree.body.children.borrow_mut().drain(..).collect();
    for child in &children {
        child.parent.set(None);
    }
    Ok(children)
}

/// Serialise the children of `node` (not the node itself).
pub fn serialize_children(node: &Handle) -> Result<String, Md2PdfError> {
    let mut out = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut out, &SerializableHandle::from(node.clone()), opts)
        .map_err(|e| Md2PdfError::Internal(format!("HTML serialization failed: {e}")))?;
    String::from_utf8(out).map_err(|e| Md2PdfError::Internal(format!("UTF-8 conversion failed: {e}")))
}

/// Create an HTML element with attributes.
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attributes = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: (*value).into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(tag)),
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node.
pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.into()),
        },
    })
}

/// Local tag name, if `node` is an element.
pub fn tag_name(node: &Handle) -> Option<&str> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(&*name.local),
        _ => None,
    }
}

pub fn is_element(node: &Handle, tag: &str) -> bool {
    tag_name(node) == Some(tag)
}

pub fn get_attr(node: &Handle, attr: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Set or replace an attribute value.
pub fn set_attr(node: &Handle, attr: &str, value: &str) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == attr) {
            Some(existing) => existing.value = value.into(),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr)),
                value: value.into(),
            }),
        }
    }
}

pub fn has_class(node: &Handle, class: &str) -> bool {
    get_attr(node, "class")
        .map(|c| c.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Concatenated text of all descendant text nodes.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { ref contents } = node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// Depth-first, document-order list of descendant elements matching `pred`.
///
/// Collected up front so callers may mutate the tree while iterating.
pub fn find_all(root: &Handle, pred: impl Fn(&Handle) -> bool) -> Vec<Handle> {
    let mut found = Vec::new();
    walk(root, &pred, &mut found);
    found
}

fn walk(node: &Handle, pred: &impl Fn(&Handle) -> bool, found: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if pred(child) {
            found.push(child.clone());
        }
        walk(child, pred, found);
    }
}

pub fn find_element(root: &Handle, tag: &str) -> Option<Handle> {
    find_all(root, |n| is_element(n, tag)).into_iter().next()
}

pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// Append `child` to `parent`, detaching it from any previous parent first.
pub fn append(parent: &Handle, child: Handle) {
    detach(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Remove `node` from its parent, if it has one.
pub fn detach(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, node));
    }
    node.parent.set(None);
}

/// Put `new` in the position `old` occupies; `old` is left detached.
pub fn replace(old: &Handle, new: Handle) {
    let Some(parent) = parent_of(old) else {
        return;
    };
    detach(&new);
    new.parent.set(Some(Rc::downgrade(&parent)));
    {
        let mut children = parent.children.borrow_mut();
        if let Some(idx) = children.iter().position(|c| Rc::ptr_eq(c, old)) {
            children[idx] = new;
        }
    }
    old.parent.set(None);
}

/// Move all children of `from` to the end of `to`.
pub fn move_children(from: &Handle, to: &Handle) {
    let children: Vec<Handle> = from.children.borrow_mut().drain(..).collect();
    for child in children {
        child.parent.set(Some(Rc::downgrade(to)));
        to.children.borrow_mut().push(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_serialize_fragment() {
        let tree = parse("<p>Hello <em>world</em></p>").unwrap();
        assert_eq!(serialize_children(&tree.body).unwrap(), "<p>Hello <em>world</em></p>");
    }

    #[test]
    fn replace_keeps_sibling_order() {
        let tree = parse("<p>a</p><p>b</p><p>c</p>").unwrap();
        let middle = find_all(&tree.body, |n| is_element(n, "p"))[1].clone();
        replace(&middle, create_element("hr", &[]));
        assert_eq!(serialize_children(&tree.body).unwrap(), "<p>a</p><hr><p>c</p>");
    }

    #[test]
    fn attributes_round_trip() {
        let el = create_element("div", &[("class", "a b")]);
        assert!(has_class(&el, "b"));
        set_attr(&el, "id", "x");
        assert_eq!(get_attr(&el, "id").as_deref(), Some("x"));
    }

    #[test]
    fn text_content_spans_descendants() {
        let tree = parse("<h1>One <code>two</code></h1>").unwrap();
        assert_eq!(text_content(&tree.body), "One two");
    }
}
