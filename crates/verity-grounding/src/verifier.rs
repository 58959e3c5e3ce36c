//! Grounding verifier
//!
//! Decides whether a generated answer may be delivered. The check is
//! fail-closed: an answer is accepted only when every numeric claim in it is
//! found in the corpus AND the original query has topical citations.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use verity_corpus::{extract_numeric_facts, Citation, KnowledgeIndex};

/// Refusal when a numeric claim is not found in the corpus
pub const CANNOT_VERIFY_MESSAGE: &str = "Jag kan inte verifiera det.";

/// Refusal when the query has no topical support in the corpus
pub const NO_SUPPORT_MESSAGE: &str = "Jag hittar inget stöd i kunskapsbasen.";

/// Texts delivered in place of a rejected answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefusalMessages {
    /// An extracted fact had no match in the corpus
    pub cannot_verify_message: String,
    /// The corpus search for the query came back empty
    pub no_support_message: String,
}

impl Default for RefusalMessages {
    fn default() -> Self {
        Self {
            cannot_verify_message: CANNOT_VERIFY_MESSAGE.to_string(),
            no_support_message: NO_SUPPORT_MESSAGE.to_string(),
        }
    }
}

/// Why an answer was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A numeric fact is not in the corpus
    UnverifiedFact {
        /// First fact that failed
        fact: String,
    },
    /// The query has no citations
    NoSupport,
}

/// Result of verifying an answer
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingOutcome {
    /// Whether the answer may be delivered as-is
    pub accepted: bool,
    /// The answer verbatim when accepted, otherwise the refusal text
    pub text: String,
    /// Evidence for an accepted answer; empty on rejection
    pub citations: Vec<Citation>,
    /// Set when `accepted` is false
    pub rejection: Option<Rejection>,
}

impl GroundingOutcome {
    fn accept(text: &str, citations: Vec<Citation>) -> Self {
        Self {
            accepted: true,
            text: text.to_string(),
            citations,
            rejection: None,
        }
    }

    fn reject(text: &str, rejection: Rejection) -> Self {
        Self {
            accepted: false,
            text: text.to_string(),
            citations: Vec::new(),
            rejection: Some(rejection),
        }
    }
}

/// Fail-closed grounding oracle over a shared [`KnowledgeIndex`]
#[derive(Debug, Clone)]
pub struct GroundingVerifier {
    index: Arc<KnowledgeIndex>,
    messages: RefusalMessages,
}

impl GroundingVerifier {
    /// Verifier with the default refusal texts
    #[inline]
    #[must_use]
    pub fn new(index: Arc<KnowledgeIndex>) -> Self {
        Self::with_messages(index, RefusalMessages::default())
    }

    /// Verifier with custom refusal texts
    #[inline]
    #[must_use]
    pub fn with_messages(index: Arc<KnowledgeIndex>, messages: RefusalMessages) -> Self {
        Self { index, messages }
    }

    /// Index this verifier consults
    #[inline]
    #[must_use]
    pub fn index(&self) -> &Arc<KnowledgeIndex> {
        &self.index
    }

    /// Verify `answer` against the corpus for `query`.
    ///
    /// # Workflow
    /// 1. Extract numeric facts from the answer
    /// 2. Every fact must match a corpus fact, textually or numerically;
    ///    one miss rejects the whole answer
    /// 3. The query must yield at least one citation
    /// 4. Accept the answer verbatim with those citations
    ///
    /// A single corpus snapshot serves both checks, so a concurrent reload
    /// cannot split one verification across two corpora.
    #[must_use]
    pub fn verify(&self, answer: &str, query: &str) -> GroundingOutcome {
        let corpus = self.index.snapshot();
        let facts = extract_numeric_facts(answer);

        for fact in &facts {
            if !corpus.supports_fact(&fact.raw, &fact.normalized) {
                tracing::info!("Rejected answer: unverified fact {:?}", fact.raw);
                return GroundingOutcome::reject(
                    &self.messages.cannot_verify_message,
                    Rejection::UnverifiedFact {
                        fact: fact.raw.clone(),
                    },
                );
            }
        }

        let citations = self.index.search_in(&corpus, query);
        if citations.is_empty() {
            tracing::info!("Rejected answer: no citations for query {:?}", query);
            return GroundingOutcome::reject(&self.messages.no_support_message, Rejection::NoSupport);
        }

        tracing::debug!(
            "Accepted answer: {} facts verified, {} citations",
            facts.len(),
            citations.len()
        );
        GroundingOutcome::accept(answer, citations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_corpus::{Corpus, CorpusConfig, Document, Lexicon};

    fn verifier() -> GroundingVerifier {
        let corpus = Corpus::from_documents(vec![Document::new(
            "kb/priser.md",
            "Basic kostar 99 kr/månad\nRabatt 12,5%\n",
        )]);
        GroundingVerifier::new(Arc::new(KnowledgeIndex::new(
            corpus,
            Lexicon::builtin(),
            CorpusConfig::default(),
        )))
    }

    #[test]
    fn accepts_supported_numbers_verbatim() {
        let outcome = verifier().verify("Basic kostar 99 kr/månad", "pris");
        assert!(outcome.accepted);
        assert_eq!(outcome.text, "Basic kostar 99 kr/månad");
        assert!(!outcome.citations.is_empty());
        assert_eq!(outcome.rejection, None);
    }

    #[test]
    fn numeric_equality_bridges_formats() {
        // corpus only has "12,5%" / "12.5%"; "12.5" matches by value
        let outcome = verifier().verify("Rabatten är 12.5 procent", "rabatt");
        assert!(outcome.accepted, "{outcome:?}");
    }

    #[test]
    fn one_unknown_number_rejects_everything() {
        let outcome = verifier().verify("Basic kostar 99 kr, Premium 777 kr", "pris");
        assert!(!outcome.accepted);
        assert_eq!(outcome.text, CANNOT_VERIFY_MESSAGE);
        assert!(outcome.citations.is_empty());
        assert_eq!(
            outcome.rejection,
            Some(Rejection::UnverifiedFact { fact: "777".into() })
        );
    }

    #[test]
    fn verified_numbers_still_need_citations() {
        let outcome = verifier().verify("Det blir 99", "xyzabc");
        assert!(!outcome.accepted);
        assert_eq!(outcome.text, NO_SUPPORT_MESSAGE);
        assert_eq!(outcome.rejection, Some(Rejection::NoSupport));
    }

    #[test]
    fn custom_refusal_texts() {
        let base = verifier();
        let custom = GroundingVerifier::with_messages(
            Arc::clone(base.index()),
            RefusalMessages {
                cannot_verify_message: "cannot verify".into(),
                no_support_message: "no support".into(),
            },
        );
        assert_eq!(custom.verify("777", "pris").text, "cannot verify");
        assert_eq!(custom.verify("hej", "xyzabc").text, "no support");
    }
}
