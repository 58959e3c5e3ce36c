//! Citations evidencing an answer

use serde::{Deserialize, Serialize};

/// One line of source text that mentioned a query keyword
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Id of the document the line came from
    pub source_id: String,
    /// The trimmed line
    pub snippet: String,
}

impl Citation {
    /// Create a citation
    #[inline]
    #[must_use]
    pub fn new(source_id: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            snippet: snippet.into(),
        }
    }
}
