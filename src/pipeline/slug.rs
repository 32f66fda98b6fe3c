//! GitHub-style heading slugs, shared by TOC generation and heading anchors
//! so that TOC links always land on the anchors the markup chain emits.

use std::collections::HashMap;

/// Stateful slug generator; repeated headings get `-1`, `-2`, … suffixes.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for `text`, unique within this slugger.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut candidate = base.clone();
        if let Some(mut count) = self.seen.get(&base).copied() {
            loop {
                count += 1;
                candidate = format!("{base}-{count}");
                if !self.seen.contains_key(&candidate) {
                    break;
                }
            }
            self.seen.insert(base, count);
        }
        self.seen.insert(candidate.clone(), 0);
        candidate
    }
}

/// Lower-case, drop punctuation other than `-` and `_`, spaces become `-`.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}
