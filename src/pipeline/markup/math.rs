//! TeX math to MathML.
//!
//! The parser marks math with `data-math-style="inline|display"`. Each such
//! element is replaced by MathML; an expression that fails to convert keeps
//! its TeX source and a `math-error` class.

use super::dom;
use latex2mathml::{latex_to_mathml, DisplayStyle};
use markup5ever_rcdom::Handle;
use tracing::warn;

pub fn apply(body: &Handle) {
    for node in dom::find_all(body, |n| dom::get_attr(n, "data-math-style").is_some()) {
        let display = dom::get_attr(&node, "data-math-style").as_deref() == Some("display");
        let tex = dom::text_content(&node);
        let style = if display { DisplayStyle::Block } else { DisplayStyle::Inline };

        let mathml = match latex_to_mathml(tex.trim(), style) {
            Ok(m) => m,
            Err(e) => {
                warn!("Math conversion failed for '{}': {}", tex.trim(), e);
                dom::set_attr(&node, "class", "math math-error");
                continue;
            }
        };
        let Ok(parsed) = dom::parse_nodes(&mathml) else {
            continue;
        };

        let wrapper = if display {
            dom::create_element("div", &[("class", "math math-display")])
        } else {
            dom::create_element("span", &[("class", "math math-inline")])
        };
        for child in parsed {
            dom::append(&wrapper, child);
        }
        dom::replace(&node, wrapper);
    }
}
