//! Query lexicon: stopwords and synonym expansion
//!
//! The built-in table targets Swedish customer-support questions. Deployments
//! swap it out through configuration; the search algorithm does not care what
//! the words are.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Characters treated as word separators in addition to whitespace
const QUERY_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

const DEFAULT_STOPWORDS: &[&str] = &[
    "vad", "hur", "när", "var", "vilka", "vilken", "är", "den", "det", "de", "som", "på", "i",
    "för", "med", "att",
];

const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("kostar", &["pris", "kostnad", "avgift"]),
    ("pris", &["kostar", "kostnad", "avgift"]),
    ("premium", &["premium"]),
    ("basic", &["basic"]),
    ("standard", &["standard"]),
    ("ring", &["telefon", "kontakt"]),
    ("telefon", &["ring", "kontakt"]),
    ("ångerrätt", &["ångra", "villkor", "policy"]),
    ("ångerrätten", &["ångerrätt", "ångra", "villkor", "policy"]),
    ("lång", &["dagar", "tid"]),
];

/// Stopword list and synonym table used to turn a query into keywords
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    /// Words dropped from queries
    pub stopwords: HashSet<String>,
    /// keyword -> related terms searched alongside it
    pub synonyms: HashMap<String, Vec<String>>,
    /// Keywords must be longer than this many characters
    pub min_keyword_chars: usize,
}

impl Lexicon {
    /// Built-in support-desk lexicon
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            stopwords: DEFAULT_STOPWORDS.iter().map(|w| (*w).to_string()).collect(),
            synonyms: DEFAULT_SYNONYMS
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.iter().map(|s| (*s).to_string()).collect()))
                .collect(),
            min_keyword_chars: 2,
        }
    }

    /// Empty lexicon: no stopwords, no synonyms
    #[must_use]
    pub fn empty() -> Self {
        Self {
            stopwords: HashSet::new(),
            synonyms: HashMap::new(),
            min_keyword_chars: 2,
        }
    }

    /// Turn a query into the ordered set of lowercase keywords to search for.
    ///
    /// Punctuation is stripped, stopwords and short words dropped, and each
    /// surviving word is followed by its synonyms.
    #[must_use]
    pub fn expand_query(&self, query: &str) -> IndexSet<String> {
        let lower = query.to_lowercase();
        let mut keywords = IndexSet::new();

        for word in lower.split(|c: char| c.is_whitespace() || QUERY_PUNCTUATION.contains(&c)) {
            if word.chars().count() <= self.min_keyword_chars || self.stopwords.contains(word) {
                continue;
            }
            keywords.insert(word.to_string());
            if let Some(related) = self.synonyms.get(word) {
                for term in related {
                    keywords.insert(term.to_lowercase());
                }
            }
        }

        keywords
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}
