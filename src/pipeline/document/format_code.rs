//! Fenced code block reformatting.
//!
//! Blocks are formatted in parallel; each result is written back to its own
//! node. A block whose language has no formatter, or whose formatter fails,
//! keeps its original text.

use crate::formatters::{normalize_language, FormatterRegistry};
use comrak::nodes::{AstNode, NodeValue};
use rayon::prelude::*;
use tracing::debug;

pub fn apply<'a>(root: &'a AstNode<'a>, registry: &FormatterRegistry) {
    // Tree nodes are not `Sync`; only the (language, code) pairs cross threads.
    let (nodes, jobs): (Vec<&'a AstNode<'a>>, Vec<(String, String)>) = root
        .descendants()
        .filter_map(|node| match &node.data.borrow().value {
            NodeValue::CodeBlock(block) if block.fenced => {
                let lang = normalize_language(&block.info)?;
                Some((node, (lang, block.literal.clone())))
            }
            _ => None,
        })
        .unzip();

    if jobs.is_empty() {
        return;
    }

    let formatted: Vec<Option<String>> = jobs
        .par_iter()
        .map(|(lang, code)| registry.format(lang, code))
        .collect();

    for ((node, (lang, _)), result) in nodes.into_iter().zip(jobs).zip(formatted) {
        match result {
            Some(code) => {
                if let NodeValue::CodeBlock(ref mut block) = node.data.borrow_mut().value {
                    block.literal = code;
                }
            }
            None => debug!("code block left unformatted ({})", lang),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{parse, render};
    use super::*;
    use comrak::Arena;
    use pretty_assertions::assert_eq;

    fn format_twice(md: &str) -> (String, String) {
        let registry = FormatterRegistry::with_defaults();
        let arena = Arena::new();
        let root = parse(&arena, md);
        apply(root, &registry);
        let first = render(root);
        apply(root, &registry);
        (first, render(root))
    }

    #[test]
    fn json_block_is_formatted() {
        let (html, _) = format_twice("```json\n{\"a\":1}\n```\n");
        assert!(html.contains("{\n\t&quot;a&quot;: 1\n}"), "got: {html}");
    }

    #[test]
    fn second_pass_is_byte_identical() {
        let (first, second) = format_twice("```JSON\n{\"a\": [1, 2], \"b\": {\"c\": null}}\n```\n");
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_language_untouched() {
        let (html, _) = format_twice("```brainfuck\n+[-]\n```\n");
        assert!(html.contains("+[-]"));
    }

    #[test]
    fn invalid_input_untouched() {
        let (html, _) = format_twice("```json\n{broken\n```\n");
        assert!(html.contains("{broken"));
    }
}
