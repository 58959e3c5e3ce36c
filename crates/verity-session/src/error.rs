//! Error types for sessions and token generation

/// Token generator failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Generation stopped because it was cancelled; not a failure
    #[error("generation cancelled")]
    Cancelled,

    /// The generator could not produce an answer
    #[error("generation failed: {0}")]
    Failed(String),
}

impl GenerationError {
    /// Check if this is a cancellation rather than a failure
    #[inline]
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Inbound frame could not be understood
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Not valid JSON, or not a known event shape
    #[error("malformed inbound event: {0}")]
    Malformed(#[from] serde_json::Error),
}
