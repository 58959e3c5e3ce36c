//! Wire events
//!
//! Inbound and outbound events exchanged with a client. Each event is a JSON
//! object tagged by `type` (snake_case) with camelCase fields.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use verity_actions::{ActionKind, ActionPayload, ActionResult, SuggestionId};
use verity_corpus::Citation;

/// Events a client sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A new user message; supersedes any generation in flight
    Message {
        /// Client-chosen message id
        id: String,
        /// User text
        text: String,
    },
    /// Stop the generation in flight
    Cancel,
    /// Execute a previously suggested action
    #[serde(rename_all = "camelCase")]
    ConfirmAction {
        /// Id from an earlier `action_suggestion`
        suggestion_id: SuggestionId,
    },
}

impl InboundEvent {
    /// Parse one inbound frame
    ///
    /// # Errors
    /// `ProtocolError::Malformed` if the frame is not a known event
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEndReason {
    /// Generator finished; a `response` follows
    Done,
    /// Client cancelled; no `response` follows
    Cancelled,
}

/// Events sent to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// An action was detected and awaits confirmation
    #[serde(rename_all = "camelCase")]
    ActionSuggestion {
        /// Id to echo in `confirm_action`
        suggestion_id: SuggestionId,
        /// Action kind
        action: ActionKind,
        /// Extracted parameters
        payload: ActionPayload,
    },
    /// One generated token
    Stream {
        /// Token text
        delta: String,
    },
    /// Streaming stopped
    StreamEnd {
        /// Why it stopped
        reason: StreamEndReason,
    },
    /// Final, verified answer (or refusal)
    Response {
        /// Answer text verbatim, or the refusal text
        text: String,
        /// Evidence; empty for refusals
        citations: Vec<Citation>,
    },
    /// Result of a confirmation
    #[serde(rename_all = "camelCase")]
    ActionExecuted {
        /// Confirmed id
        suggestion_id: SuggestionId,
        /// Ledger result
        result: ActionResult,
    },
    /// Session-scoped failure
    Error {
        /// Description
        message: String,
    },
}

impl OutboundEvent {
    /// Serialize for the wire
    ///
    /// # Errors
    /// Propagates `serde_json::Error`
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short label for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ActionSuggestion { .. } => "action_suggestion",
            Self::Stream { .. } => "stream",
            Self::StreamEnd { .. } => "stream_end",
            Self::Response { .. } => "response",
            Self::ActionExecuted { .. } => "action_executed",
            Self::Error { .. } => "error",
        }
    }
}
