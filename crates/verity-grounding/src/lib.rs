//! Verity Grounding
//!
//! Fail-closed verification of generated answers against the knowledge
//! corpus. An answer passes only when all of its numeric claims are found in
//! the corpus and the original question has topical citations; otherwise a
//! fixed refusal text is delivered instead.

#![warn(missing_docs)]

pub mod verifier;

pub use verifier::{
    GroundingOutcome, GroundingVerifier, Rejection, RefusalMessages, CANNOT_VERIFY_MESSAGE,
    NO_SUPPORT_MESSAGE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
