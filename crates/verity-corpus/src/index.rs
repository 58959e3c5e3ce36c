//! Knowledge corpus index
//!
//! [`Corpus`] is an immutable snapshot of loaded documents plus the union of
//! their facts. [`KnowledgeIndex`] owns the current snapshot and swaps it
//! wholesale on reload, so readers see either the old or the new corpus and
//! never a mix.

use crate::citation::Citation;
use crate::document::Document;
use crate::error::CorpusError;
use crate::facts::{numeric_value, FactSet};
use crate::lexicon::Lexicon;
use indexmap::IndexSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum citations returned by a search
pub const DEFAULT_MAX_CITATIONS: usize = 5;

/// Where and how to load documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Directory holding the documents
    pub source_dir: PathBuf,
    /// Eligible file extensions, without the dot
    pub extensions: Vec<String>,
    /// Upper bound on citations per search
    pub max_citations: usize,
}

impl CorpusConfig {
    /// Config for a directory with default settings
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            ..Self::default()
        }
    }

    fn is_eligible(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("./kb"),
            extensions: vec!["md".to_string()],
            max_citations: DEFAULT_MAX_CITATIONS,
        }
    }
}

/// Immutable set of documents with their pooled facts
#[derive(Debug, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    known_facts: FactSet,
    known_values: Vec<f64>,
}

impl Corpus {
    /// Build a corpus from documents, pooling their facts
    #[must_use]
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut known_facts = FactSet::new();
        for doc in &documents {
            known_facts.extend(doc.facts().iter().cloned());
        }
        let known_values = known_facts.iter().filter_map(|f| numeric_value(f)).collect();

        Self {
            documents,
            known_facts,
            known_values,
        }
    }

    /// Read every eligible document under `config.source_dir`
    ///
    /// # Errors
    /// - `CorpusError::NotADirectory` if the source is not a directory
    /// - `CorpusError::ReadDir` / `CorpusError::ReadDocument` on I/O failure
    pub fn load(config: &CorpusConfig) -> Result<Self, CorpusError> {
        let dir = &config.source_dir;
        if !dir.is_dir() {
            return Err(CorpusError::NotADirectory { path: dir.clone() });
        }

        let entries = std::fs::read_dir(dir).map_err(|source| CorpusError::ReadDir {
            path: dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CorpusError::ReadDir {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && config.is_eligible(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let prefix = dir
            .file_name()
            .map_or_else(|| "kb".to_string(), |n| n.to_string_lossy().into_owned());

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|source| CorpusError::ReadDocument {
                path: path.clone(),
                source,
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::debug!("Loaded document {}/{}", prefix, file_name);
            documents.push(Document::new(format!("{prefix}/{file_name}"), text));
        }

        Ok(Self::from_documents(documents))
    }

    /// Loaded documents, in load order
    #[inline]
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Union of every document's facts
    #[inline]
    #[must_use]
    pub fn known_facts(&self) -> &FactSet {
        &self.known_facts
    }

    /// Whether `fact` is supported by the corpus.
    ///
    /// Supported means the raw or normalized text appears verbatim among the
    /// known facts, or the normalized form is numerically equal to one of them.
    #[must_use]
    pub fn supports_fact(&self, raw: &str, normalized: &str) -> bool {
        if self.known_facts.contains(raw) || self.known_facts.contains(normalized) {
            return true;
        }
        match numeric_value(normalized) {
            #[allow(clippy::float_cmp)]
            Some(value) => self.known_values.iter().any(|known| *known == value),
            None => false,
        }
    }

    /// Lexical search: every non-blank line mentioning an expanded keyword.
    ///
    /// Documents are scanned in load order, keywords in expansion order.
    /// Results are deduplicated by (source, snippet) and capped at `limit`.
    #[must_use]
    pub fn search(&self, query: &str, lexicon: &Lexicon, limit: usize) -> Vec<Citation> {
        let keywords = lexicon.expand_query(query);
        let mut found: IndexSet<Citation> = IndexSet::new();

        'documents: for doc in &self.documents {
            for keyword in &keywords {
                if !doc.mentions(keyword) {
                    continue;
                }
                for line in doc.matching_lines(keyword) {
                    if found.len() >= limit {
                        break 'documents;
                    }
                    found.insert(Citation::new(doc.id(), line));
                }
            }
        }

        found.into_iter().take(limit).collect()
    }

    /// Number of documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True if no documents are loaded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Counts reported for a loaded corpus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    /// Documents loaded
    pub documents: usize,
    /// Distinct fact strings across all documents
    pub facts: usize,
}

/// Process-wide, read-mostly handle to the current corpus
#[derive(Debug)]
pub struct KnowledgeIndex {
    current: RwLock<Arc<Corpus>>,
    lexicon: Lexicon,
    config: CorpusConfig,
}

impl KnowledgeIndex {
    /// Index over an already-built corpus
    #[must_use]
    pub fn new(corpus: Corpus, lexicon: Lexicon, config: CorpusConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(corpus)),
            lexicon,
            config,
        }
    }

    /// Load the configured directory and build an index over it
    ///
    /// # Errors
    /// Propagates `CorpusError` from loading
    pub fn load(config: CorpusConfig, lexicon: Lexicon) -> Result<Self, CorpusError> {
        let corpus = Corpus::load(&config)?;
        tracing::info!(
            "Loaded {} documents from {}",
            corpus.len(),
            config.source_dir.display()
        );
        Ok(Self::new(corpus, lexicon, config))
    }

    /// Re-read the configured directory and swap in the new corpus.
    ///
    /// The old corpus stays active if loading fails.
    ///
    /// # Errors
    /// Propagates `CorpusError` from loading
    pub fn reload(&self) -> Result<CorpusStats, CorpusError> {
        let corpus = Corpus::load(&self.config)?;
        let stats = stats_of(&corpus);
        self.replace(corpus);
        tracing::info!("Reloaded corpus: {} documents, {} facts", stats.documents, stats.facts);
        Ok(stats)
    }

    /// Atomically replace the active corpus
    pub fn replace(&self, corpus: Corpus) {
        *self.current.write() = Arc::new(corpus);
    }

    /// Current corpus; stays valid across later reloads
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<Corpus> {
        Arc::clone(&self.current.read())
    }

    /// Search the current corpus
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Citation> {
        self.search_in(&self.snapshot(), query)
    }

    /// Search a specific snapshot with this index's lexicon and limit
    #[must_use]
    pub fn search_in(&self, corpus: &Corpus, query: &str) -> Vec<Citation> {
        corpus.search(query, &self.lexicon, self.config.max_citations)
    }

    /// Lexicon used for query expansion
    #[inline]
    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Counts for the current corpus
    #[must_use]
    pub fn stats(&self) -> CorpusStats {
        stats_of(&self.snapshot())
    }
}

fn stats_of(corpus: &Corpus) -> CorpusStats {
    CorpusStats {
        documents: corpus.len(),
        facts: corpus.known_facts().len(),
    }
}
