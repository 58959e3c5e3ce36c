//! Knowledge documents

use crate::facts::{extract_facts, FactSet};

/// A single knowledge document with its facts precomputed.
///
/// Immutable once built; the fact set always matches `raw_text`.
#[derive(Debug, Clone)]
pub struct Document {
    id: String,
    raw_text: String,
    lower_id: String,
    lower_text: String,
    facts: FactSet,
}

impl Document {
    /// Build a document, extracting its facts
    #[must_use]
    pub fn new(id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let id = id.into();
        let raw_text = raw_text.into();
        Self {
            lower_id: id.to_lowercase(),
            lower_text: raw_text.to_lowercase(),
            facts: extract_facts(&raw_text),
            id,
            raw_text,
        }
    }

    /// Document id (`<source-dir>/<file-name>`)
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full text as loaded
    #[inline]
    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Facts extracted at load time
    #[inline]
    #[must_use]
    pub fn facts(&self) -> &FactSet {
        &self.facts
    }

    /// Case-insensitive containment over content or id
    #[must_use]
    pub fn mentions(&self, lower_keyword: &str) -> bool {
        self.lower_text.contains(lower_keyword) || self.lower_id.contains(lower_keyword)
    }

    /// Non-blank lines containing `lower_keyword`, trimmed
    pub fn matching_lines<'a>(&'a self, lower_keyword: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.raw_text
            .split('\n')
            .filter(move |line| line.to_lowercase().contains(lower_keyword))
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}
