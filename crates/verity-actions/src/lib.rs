//! Verity Actions
//!
//! Recognizes side-effecting intents in user text and runs them only after
//! explicit confirmation:
//! - **IntentDetector**: ordered trigger phrases, phone extraction
//! - **ActionLedger**: pending/executed stores with exactly-once confirm,
//!   a repeat-confirmation cool-down, and a background expiry sweeper
//!
//! # Example
//!
//! ```rust
//! use verity_actions::{ActionLedger, IntentDetector};
//!
//! let detector = IntentDetector::new();
//! let ledger = ActionLedger::default();
//!
//! let intent = detector.detect("Kan du ring mig på +46 8 123 45 67?").unwrap();
//! let suggestion = ledger.create_suggestion(intent.kind, intent.payload);
//!
//! assert!(ledger.confirm(&suggestion.id).success);
//! assert!(ledger.confirm(&suggestion.id).is_ignored());
//! ```

#![warn(missing_docs)]

pub mod detector;
pub mod ledger;
pub mod types;

// Re-exports
pub use detector::{extract_phone, DetectedIntent, IntentDetector, DEFAULT_TICKET_SUBJECT};
pub use ledger::{ActionLedger, LedgerConfig, LedgerStats, SweepReport, DEFAULT_COOLDOWN, DEFAULT_MAX_AGE};
pub use types::{ActionKind, ActionPayload, ActionResult, ActionSuggestion, ExecutedAction, SuggestionId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
