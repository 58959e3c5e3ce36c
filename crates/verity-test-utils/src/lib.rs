//! Testing utilities for the Verity workspace
//!
//! Sample knowledge base, wired-up session services, and deterministic
//! token generators.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use verity_actions::{ActionLedger, IntentDetector};
use verity_corpus::{Corpus, CorpusConfig, Document, KnowledgeIndex, Lexicon};
use verity_grounding::GroundingVerifier;
use verity_session::{GenerationError, OutboundEvent, SessionServices, TokenGenerator};

/// Sample knowledge base: (file name, contents)
pub const SAMPLE_DOCUMENTS: &[(&str, &str)] = &[
    ("kontakt.md", include_str!("fixtures/kontakt.md")),
    ("priser.md", include_str!("fixtures/priser.md")),
    ("villkor.md", include_str!("fixtures/villkor.md")),
];

/// Write the sample knowledge base into `root/kb` and return that directory
pub fn write_sample_kb(root: &Path) -> PathBuf {
    let dir = root.join("kb");
    std::fs::create_dir_all(&dir).unwrap();
    for (name, text) in SAMPLE_DOCUMENTS {
        std::fs::write(dir.join(name), text).unwrap();
    }
    dir
}

/// Sample knowledge base as an in-memory corpus, ids as `kb/<file>`
pub fn sample_corpus() -> Corpus {
    Corpus::from_documents(
        SAMPLE_DOCUMENTS
            .iter()
            .map(|(name, text)| Document::new(format!("kb/{name}"), *text))
            .collect(),
    )
}

pub fn sample_index() -> Arc<KnowledgeIndex> {
    Arc::new(KnowledgeIndex::new(
        sample_corpus(),
        Lexicon::builtin(),
        CorpusConfig::default(),
    ))
}

/// Services over the sample index with a default ledger and detector
pub fn sample_services(generator: Arc<dyn TokenGenerator>) -> Arc<SessionServices> {
    Arc::new(SessionServices {
        verifier: GroundingVerifier::new(sample_index()),
        ledger: Arc::new(ActionLedger::default()),
        detector: IntentDetector::new(),
        generator,
    })
}

/// Split `text` into space-terminated tokens the way streaming generators do
pub fn tokens_of(text: &str) -> Vec<String> {
    text.split(' ').map(|w| format!("{w} ")).collect()
}

/// Streams a fixed token list without delay
#[derive(Debug, Clone)]
pub struct FakeGenerator {
    tokens: Vec<String>,
}

impl FakeGenerator {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(tokens_of(text))
    }
}

#[async_trait::async_trait]
impl TokenGenerator for FakeGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        tokens: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<(), GenerationError> {
        for token in &self.tokens {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            tokens
                .send(token.clone())
                .await
                .map_err(|_| GenerationError::Cancelled)?;
        }
        Ok(())
    }
}

/// Streams `head`, then waits for `release()` (or cancellation) before
/// streaming `tail` and completing.
#[derive(Debug, Clone)]
pub struct HeldGenerator {
    head: Vec<String>,
    tail: Vec<String>,
    gate: Arc<Notify>,
}

impl HeldGenerator {
    pub fn new(head: &str, tail: &str) -> Self {
        Self {
            head: tokens_of(head),
            tail: tokens_of(tail),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Let one waiting (or the next) generation continue
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl TokenGenerator for HeldGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        tokens: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<(), GenerationError> {
        for token in &self.head {
            tokens
                .send(token.clone())
                .await
                .map_err(|_| GenerationError::Cancelled)?;
        }

        tokio::select! {
            () = cancel.cancelled() => return Err(GenerationError::Cancelled),
            () = self.gate.notified() => {}
        }

        for token in &self.tail {
            tokens
                .send(token.clone())
                .await
                .map_err(|_| GenerationError::Cancelled)?;
        }
        Ok(())
    }
}

/// Streams `head` and then returns an error
#[derive(Debug, Clone)]
pub struct FailingGenerator {
    head: Vec<String>,
    error: GenerationError,
}

impl FailingGenerator {
    pub fn new(head: &str, reason: &str) -> Self {
        Self::ending_with(head, GenerationError::Failed(reason.to_string()))
    }

    /// Gives up with `GenerationError::Cancelled` without being cancelled
    pub fn giving_up(head: &str) -> Self {
        Self::ending_with(head, GenerationError::Cancelled)
    }

    fn ending_with(head: &str, error: GenerationError) -> Self {
        Self {
            head: if head.is_empty() { Vec::new() } else { tokens_of(head) },
            error,
        }
    }
}

#[async_trait::async_trait]
impl TokenGenerator for FailingGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        tokens: mpsc::Sender<String>,
        _cancel: CancellationToken,
    ) -> Result<(), GenerationError> {
        for token in &self.head {
            tokens
                .send(token.clone())
                .await
                .map_err(|_| GenerationError::Cancelled)?;
        }
        Err(self.error.clone())
    }
}

/// Receive the next event, panicking if none arrives within a second
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> OutboundEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Receive events up to and including the first one matching `stop`
pub async fn events_until(
    rx: &mut mpsc::UnboundedReceiver<OutboundEvent>,
    stop: impl Fn(&OutboundEvent) -> bool,
) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    loop {
        let event = next_event(rx).await;
        let done = stop(&event);
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Everything already queued, without waiting
pub fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Concatenated `stream` deltas
pub fn streamed_text(events: &[OutboundEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            OutboundEvent::Stream { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}
