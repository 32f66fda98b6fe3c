//! Document-tree transform chain over the comrak arena AST.
//!
//! The chain is a fixed, ordered list; ordering is part of the contract:
//!
//! ```text
//! page_breaks ─▶ cross_refs ─▶ toc ─▶ frontmatter ─▶ format_code ─▶ [user transforms]
//! ```
//!
//! Math recognition happens in the parser itself (`$…$` / `$$…$$` become
//! `Math` nodes when the math toggle is on), so it has no stage here.
//! Every transform is a no-op when nothing matches.

pub mod cross_refs;
pub mod format_code;
pub mod page_breaks;
pub mod toc;

use crate::error::Md2PdfError;
use comrak::nodes::{Ast, AstNode, LineColumn, NodeValue};
use comrak::Arena;
use std::cell::RefCell;
use std::sync::Arc;

/// One mutation of the document tree.
///
/// User-supplied transforms are appended after the built-in chain.
pub trait DocumentTransform: Send + Sync {
    fn name(&self) -> &str;

    fn apply<'a>(&self, arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) -> Result<(), Md2PdfError>;
}

/// Toggles that select built-in document stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentOptions {
    pub toc: bool,
    pub frontmatter: bool,
    pub format_code: bool,
}

/// Run the built-in chain, then `extra` in list order.
pub fn run_chain<'a>(
    arena: &'a Arena<AstNode<'a>>,
    root: &'a AstNode<'a>,
    options: DocumentOptions,
    extra: &[Arc<dyn DocumentTransform>],
) -> Result<(), Md2PdfError> {
    page_breaks::apply(arena, root);
    cross_refs::apply(arena, root);
    if options.toc {
        toc::apply(arena, root);
    }
    if options.frontmatter {
        strip_frontmatter(root);
    }
    if options.format_code {
        format_code::apply(root, &crate::formatters::DEFAULT_FORMATTERS);
    }
    for transform in extra {
        tracing::debug!("document transform: {}", transform.name());
        transform.apply(arena, root)?;
    }
    Ok(())
}

/// Drop any front matter block the parser recognised.
///
/// Metadata is exposed to templates, never rendered into the body.
fn strip_frontmatter<'a>(root: &'a AstNode<'a>) {
    let blocks: Vec<_> = root
        .children()
        .filter(|n| matches!(n.data.borrow().value, NodeValue::FrontMatter(_)))
        .collect();
    for node in blocks {
        node.detach();
    }
}

/// Allocate a detached node in `arena`.
pub(crate) fn new_node<'a>(arena: &'a Arena<AstNode<'a>>, value: NodeValue) -> &'a AstNode<'a> {
    arena.alloc(AstNode::new(RefCell::new(Ast::new(value, LineColumn { line: 0, column: 0 }))))
}

/// Plain text of a node's inline content.
///
/// Image alt text is included and footnote references are not, matching the
/// text the heading-anchor pass slugs.
pub(crate) fn inline_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for d in node.descendants() {
        match &d.data.borrow().value {
            NodeValue::Text(t) => out.push_str(t),
            NodeValue::Code(c) => out.push_str(&c.literal),
            NodeValue::Math(m) => out.push_str(&m.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use comrak::nodes::AstNode;
    use comrak::{format_html, parse_document, Arena, Options};

    pub fn options() -> Options<'static> {
        let mut options = Options::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        options.extension.footnotes = true;
        options
    }

    pub fn render<'a>(root: &'a AstNode<'a>) -> String {
        let mut out = Vec::new();
        format_html(root, &options(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    pub fn parse<'a>(arena: &'a Arena<AstNode<'a>>, md: &str) -> &'a AstNode<'a> {
        parse_document(arena, md, &options())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use comrak::Options;

    #[test]
    fn frontmatter_block_is_removed() {
        let arena = Arena::new();
        let mut opts = Options::default();
        opts.extension.front_matter_delimiter = Some("---".into());
        let root = comrak::parse_document(&arena, "---\ntitle: x\n---\n\n# Body\n", &opts);
        strip_frontmatter(root);
        let html = render(root);
        assert!(!html.contains("title: x"), "got: {html}");
        assert!(html.contains("Body"));
    }

    #[test]
    fn inline_text_flattens_emphasis_and_code() {
        let arena = Arena::new();
        let root = parse(&arena, "# Using *the* `api`\n");
        let heading = root.first_child().unwrap();
        assert_eq!(inline_text(heading), "Using the api");
    }

    struct Uppercase;

    impl DocumentTransform for Uppercase {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn apply<'a>(&self, _arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>) -> Result<(), Md2PdfError> {
            for node in root.descendants() {
                if let NodeValue::Text(ref mut t) = node.data.borrow_mut().value {
                    *t = t.to_uppercase();
                }
            }
            Ok(())
        }
    }

    #[test]
    fn user_transforms_run_after_builtins() {
        let arena = Arena::new();
        let root = parse(&arena, "See @ref(intro)\n");
        let extra: Vec<Arc<dyn DocumentTransform>> = vec![Arc::new(Uppercase)];
        run_chain(&arena, root, DocumentOptions::default(), &extra).unwrap();
        // cross_refs ran first, so the link target keeps its case
        assert!(render(root).contains(r##"<a href="#intro">INTRO</a>"##));
    }
}
