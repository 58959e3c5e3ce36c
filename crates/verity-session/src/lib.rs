//! Verity Session
//!
//! Per-connection streaming conversation:
//! - **events**: JSON wire events (`message`, `cancel`, `confirm_action` in;
//!   `stream`, `stream_end`, `response`, `action_suggestion`,
//!   `action_executed`, `error` out)
//! - **TokenGenerator**: the answer-producing seam, with a scripted demo
//!   implementation
//! - **SessionController**: starts, supersedes and cancels generations,
//!   streams tokens, and delivers only grounded final answers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use verity_actions::{ActionLedger, IntentDetector};
//! use verity_corpus::{CorpusConfig, KnowledgeIndex, Lexicon};
//! use verity_grounding::GroundingVerifier;
//! use verity_session::{ScriptedGenerator, SessionController, SessionServices};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let index = Arc::new(KnowledgeIndex::load(CorpusConfig::default(), Lexicon::builtin())?);
//! let services = Arc::new(SessionServices {
//!     verifier: GroundingVerifier::new(index),
//!     ledger: Arc::new(ActionLedger::default()),
//!     detector: IntentDetector::new(),
//!     generator: Arc::new(ScriptedGenerator::default()),
//! });
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let controller = SessionController::new(services, tx);
//! controller.handle_frame(r#"{"type":"message","id":"m1","text":"Vad kostar Basic?"}"#);
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{}", event.to_json()?);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod controller;
pub mod error;
pub mod events;
pub mod generator;
pub mod scripted;
pub mod session;

// Re-exports
pub use controller::{EventSink, SessionController, SessionServices, MALFORMED_MESSAGE};
pub use error::{GenerationError, ProtocolError};
pub use events::{InboundEvent, OutboundEvent, StreamEndReason};
pub use generator::TokenGenerator;
pub use scripted::{ScriptedConfig, ScriptedGenerator};
pub use session::{Session, SessionState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
