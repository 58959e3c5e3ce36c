//! Verity Corpus
//!
//! The knowledge side of grounding:
//! - **facts**: numeric fact extraction (phones, dates, decimals, percentages, integers)
//! - **Document / Corpus**: documents with precomputed facts, pooled per snapshot
//! - **KnowledgeIndex**: atomically reloadable, lexical keyword + synonym search
//!
//! # Example
//!
//! ```rust
//! use verity_corpus::{Corpus, CorpusConfig, Document, KnowledgeIndex, Lexicon};
//!
//! let corpus = Corpus::from_documents(vec![
//!     Document::new("kb/priser.md", "Basic kostar 99 kr/månad"),
//! ]);
//! let index = KnowledgeIndex::new(corpus, Lexicon::builtin(), CorpusConfig::default());
//!
//! let citations = index.search("Vad kostar Basic?");
//! assert_eq!(citations[0].snippet, "Basic kostar 99 kr/månad");
//! ```

#![warn(missing_docs)]

pub mod citation;
pub mod document;
pub mod error;
pub mod facts;
pub mod index;
pub mod lexicon;

// Re-exports
pub use citation::Citation;
pub use document::Document;
pub use error::CorpusError;
pub use facts::{extract_facts, extract_numeric_facts, normalize_fact, numeric_value, FactSet, NumericFact};
pub use index::{Corpus, CorpusConfig, CorpusStats, KnowledgeIndex, DEFAULT_MAX_CITATIONS};
pub use lexicon::Lexicon;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
