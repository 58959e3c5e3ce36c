//! Action types
//!
//! Suggestions, their payloads, and the results of executing them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique suggestion identifier (`action_<ulid>`)
///
/// Ids arriving from clients are arbitrary strings; they simply fail lookup
/// when the ledger never issued them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(pub String);

impl SuggestionId {
    /// Generate a fresh id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(format!("action_{}", Ulid::new().to_string().to_lowercase()))
    }

    /// Borrow the id text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SuggestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SuggestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SuggestionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Side-effecting action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Call the customer back
    ScheduleCallback,
    /// Send a text message
    SendSms,
    /// Open a support ticket
    CreateTicket,
}

impl ActionKind {
    /// Wire name of the kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScheduleCallback => "schedule_callback",
            Self::SendSms => "send_sms",
            Self::CreateTicket => "create_ticket",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of an action; only present keys are serialized
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// Phone number, whitespace collapsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Requested time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Ticket subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Free-form message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionPayload {
    /// With phone number
    #[inline]
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// With ticket subject
    #[inline]
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// An action proposed to the user, awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSuggestion {
    /// Unique id the client echoes back to confirm
    pub id: SuggestionId,
    /// What will happen on confirmation
    pub kind: ActionKind,
    /// Parameters extracted from the user's text
    pub payload: ActionPayload,
    /// Creation time; drives expiry
    pub created_at: DateTime<Utc>,
}

/// Outcome of a confirmation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    /// Whether the action ran (now or within the cool-down)
    pub success: bool,
    /// Present and true when the confirmation repeated a recent execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
    /// Human-readable outcome
    pub message: String,
    /// Suggestion the result belongs to
    pub suggestion_id: SuggestionId,
}

impl ActionResult {
    pub(crate) fn executed(suggestion_id: SuggestionId, message: String) -> Self {
        Self {
            success: true,
            ignored: None,
            message,
            suggestion_id,
        }
    }

    pub(crate) fn already_executed(suggestion_id: SuggestionId, cooldown_secs: u64) -> Self {
        Self {
            success: true,
            ignored: Some(true),
            message: format!("Action already executed within {cooldown_secs} seconds"),
            suggestion_id,
        }
    }

    pub(crate) fn not_found(suggestion_id: SuggestionId) -> Self {
        Self {
            success: false,
            ignored: None,
            message: "Action not found or expired".to_string(),
            suggestion_id,
        }
    }

    /// True when this result repeated an earlier execution
    #[inline]
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.ignored == Some(true)
    }
}

/// Record of an executed suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedAction {
    /// Suggestion that was executed
    pub suggestion_id: SuggestionId,
    /// Execution time; drives cool-down and purge
    pub executed_at: DateTime<Utc>,
    /// Result returned by the execution
    pub result: ActionResult,
}
