//! Per-connection session state
//!
//! ```text
//! Idle --message--> Streaming --done|cancel|error--> Idle
//!                       \--message--> Streaming (previous generation cancelled)
//! ```
//!
//! Each generation gets a sequence number; a completion is honoured only if
//! its number is still the active one.

use tokio_util::sync::CancellationToken;

/// Coarse session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No generation in flight
    Idle,
    /// A generation is streaming
    Streaming,
}

#[derive(Debug)]
pub(crate) struct ActiveGeneration {
    pub(crate) sequence: u64,
    pub(crate) message_id: String,
    pub(crate) cancel: CancellationToken,
}

/// State owned by one connection
#[derive(Debug, Default)]
pub struct Session {
    active: Option<ActiveGeneration>,
    started: u64,
}

impl Session {
    /// Fresh idle session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Streaming
        } else {
            SessionState::Idle
        }
    }

    /// Message id of the generation in flight
    #[inline]
    #[must_use]
    pub fn active_message_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.message_id.as_str())
    }

    /// Start a generation, returning its sequence number and whatever it displaced
    pub(crate) fn begin(
        &mut self,
        message_id: String,
        cancel: CancellationToken,
    ) -> (u64, Option<ActiveGeneration>) {
        self.started += 1;
        let sequence = self.started;
        let displaced = self.active.replace(ActiveGeneration {
            sequence,
            message_id,
            cancel,
        });
        (sequence, displaced)
    }

    pub(crate) fn is_current(&self, sequence: u64) -> bool {
        self.active.as_ref().is_some_and(|a| a.sequence == sequence)
    }

    /// End generation `sequence` if it is still the active one
    pub(crate) fn finish(&mut self, sequence: u64) -> bool {
        if self.is_current(sequence) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Detach the active generation, if any
    pub(crate) fn take_active(&mut self) -> Option<ActiveGeneration> {
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_displaces_previous() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);

        let (first, displaced) = session.begin("a".into(), CancellationToken::new());
        assert!(displaced.is_none());
        let (second, displaced) = session.begin("b".into(), CancellationToken::new());

        assert_eq!(displaced.map(|d| d.message_id), Some("a".to_string()));
        assert!(!session.is_current(first));
        assert!(session.is_current(second));
        assert_eq!(session.active_message_id(), Some("b"));
    }

    #[test]
    fn stale_finish_is_refused() {
        let mut session = Session::new();
        let (first, _) = session.begin("a".into(), CancellationToken::new());
        let (second, _) = session.begin("a".into(), CancellationToken::new());

        assert!(!session.finish(first));
        assert_eq!(session.state(), SessionState::Streaming);
        assert!(session.finish(second));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn take_active_empties_session() {
        let mut session = Session::new();
        assert!(session.take_active().is_none());
        session.begin("a".into(), CancellationToken::new());
        assert!(session.take_active().is_some());
        assert_eq!(session.state(), SessionState::Idle);
    }
}
