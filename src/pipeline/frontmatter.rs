//! Leading YAML front matter.
//!
//! `---` fenced metadata at the very start of the document is split from the
//! body and flattened to string values for template substitution. It is
//! never rendered into the body.

use std::collections::BTreeMap;
use tracing::warn;

/// Template substitution data: front matter fields plus derived values.
pub type TemplateData = BTreeMap<String, String>;

/// Split front matter from `markdown`, returning the body and its fields.
///
/// Malformed YAML is logged and the document is used unchanged.
pub fn split(markdown: &str) -> (String, TemplateData) {
    let Some((yaml, body)) = locate(markdown) else {
        return (markdown.to_string(), TemplateData::new());
    };

    match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
        Ok(serde_yaml::Value::Mapping(map)) => {
            let data = map
                .into_iter()
                .filter_map(|(k, v)| Some((scalar_to_string(&k)?, value_to_string(&v)?)))
                .collect();
            (body.to_string(), data)
        }
        // Empty or scalar front matter: still stripped, nothing to expose.
        Ok(_) => (body.to_string(), TemplateData::new()),
        Err(e) => {
            warn!("Ignoring malformed front matter: {}", e);
            (markdown.to_string(), TemplateData::new())
        }
    }
}

/// Byte ranges of the YAML block and the remaining body.
fn locate(markdown: &str) -> Option<(&str, &str)> {
    let text = markdown.strip_prefix('\u{feff}').unwrap_or(markdown);
    let rest = text
        .strip_prefix("---\r\n")
        .or_else(|| text.strip_prefix("---\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body.trim_start_matches(['\r', '\n'])));
        }
        offset += line.len();
    }
    None
}

fn scalar_to_string(v: &serde_yaml::Value) -> Option<String> {
    match v {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_string(v: &serde_yaml::Value) -> Option<String> {
    match v {
        serde_yaml::Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        serde_yaml::Value::Null => Some(String::new()),
        other => scalar_to_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_metadata_from_body() {
        let (body, data) = split("---\ntitle: Report\nversion: 2\ndraft: true\n---\n\n# Heading\n");
        assert_eq!(body, "# Heading\n");
        assert_eq!(data.get("title").map(String::as_str), Some("Report"));
        assert_eq!(data.get("version").map(String::as_str), Some("2"));
        assert_eq!(data.get("draft").map(String::as_str), Some("true"));
    }

    #[test]
    fn sequences_are_joined() {
        let (_, data) = split("---\nauthors: [Ada, Grace]\n---\nx\n");
        assert_eq!(data.get("authors").map(String::as_str), Some("Ada, Grace"));
    }

    #[test]
    fn no_front_matter_is_passthrough() {
        let (body, data) = split("# Title\n\n---\n");
        assert_eq!(body, "# Title\n\n---\n");
        assert!(data.is_empty());
    }

    #[test]
    fn unterminated_block_is_passthrough() {
        let (body, data) = split("---\ntitle: x\n");
        assert_eq!(body, "---\ntitle: x\n");
        assert!(data.is_empty());
    }

    #[test]
    fn malformed_yaml_keeps_document() {
        let src = "---\ntitle: [unclosed\n---\nBody\n";
        let (body, data) = split(src);
        assert_eq!(body, src);
        assert!(data.is_empty());
    }
}
