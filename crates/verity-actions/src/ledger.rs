//! Confirmation ledger
//!
//! Server-scoped store of pending and executed suggestions. Lifecycle per id:
//!
//! ```text
//! Pending --confirm--> Executed --(max age)--> Purged
//!    \--(max age)--> Expired
//! ```
//!
//! Both stores sit behind one mutex: confirm checks the executed store,
//! takes the pending entry and records the execution as a single step, so
//! concurrent confirmations of the same id execute it at most once.

use crate::types::{ActionKind, ActionPayload, ActionResult, ActionSuggestion, ExecutedAction, SuggestionId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Repeat confirmations inside this window are no-ops
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Entries older than this are swept
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// Ledger timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Window after execution in which a repeat confirmation is ignored
    pub cooldown: Duration,
    /// Age after which pending and executed entries are swept
    pub max_age: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// Store sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    /// Suggestions awaiting confirmation
    pub pending: usize,
    /// Executions still remembered
    pub executed: usize,
}

/// Entries removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending suggestions that expired unconfirmed
    pub expired_pending: usize,
    /// Executed records purged
    pub purged_executed: usize,
}

#[derive(Debug, Default)]
struct LedgerState {
    pending: HashMap<SuggestionId, ActionSuggestion>,
    executed: HashMap<SuggestionId, ExecutedAction>,
}

/// Pending/executed action stores shared by every connection
#[derive(Debug, Default)]
pub struct ActionLedger {
    config: LedgerConfig,
    state: Mutex<LedgerState>,
}

impl ActionLedger {
    /// Ledger with the given timing
    #[inline]
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Timing in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    /// Store a new pending suggestion under a fresh id
    pub fn create_suggestion(&self, kind: ActionKind, payload: ActionPayload) -> ActionSuggestion {
        self.create_suggestion_at(kind, payload, Utc::now())
    }

    /// [`Self::create_suggestion`] with an explicit clock reading
    pub fn create_suggestion_at(
        &self,
        kind: ActionKind,
        payload: ActionPayload,
        now: DateTime<Utc>,
    ) -> ActionSuggestion {
        let suggestion = ActionSuggestion {
            id: SuggestionId::new(),
            kind,
            payload,
            created_at: now,
        };
        self.state
            .lock()
            .pending
            .insert(suggestion.id.clone(), suggestion.clone());
        tracing::info!("Created {} suggestion {}", kind, suggestion.id);
        suggestion
    }

    /// Confirm a suggestion, executing it at most once
    pub fn confirm(&self, id: &SuggestionId) -> ActionResult {
        self.confirm_at(id, Utc::now())
    }

    /// [`Self::confirm`] with an explicit clock reading
    ///
    /// # Returns
    /// - `success, ignored` if `id` executed less than the cool-down ago
    /// - `!success` if `id` is neither pending nor recently executed, or has
    ///   been pending longer than the max age (the stale entry is dropped)
    /// - `success` after executing the pending suggestion
    pub fn confirm_at(&self, id: &SuggestionId, now: DateTime<Utc>) -> ActionResult {
        let mut state = self.state.lock();

        if let Some(done) = state.executed.get(id) {
            if age(done.executed_at, now) < self.config.cooldown {
                tracing::debug!("Ignoring repeat confirmation of {}", id);
                return ActionResult::already_executed(id.clone(), self.config.cooldown.as_secs());
            }
        }

        let Some(suggestion) = state.pending.remove(id) else {
            tracing::debug!("Confirmation for unknown or expired suggestion {}", id);
            return ActionResult::not_found(id.clone());
        };
        // expiry bound matches sweep_expired_at
        if age(suggestion.created_at, now) > self.config.max_age {
            tracing::debug!("Suggestion {} expired before confirmation", id);
            return ActionResult::not_found(id.clone());
        }

        let result = ActionResult::executed(id.clone(), execution_message(&suggestion));
        state.executed.insert(
            id.clone(),
            ExecutedAction {
                suggestion_id: id.clone(),
                executed_at: now,
                result: result.clone(),
            },
        );
        tracing::info!("Executed {}: {}", id, result.message);
        result
    }

    /// Pending suggestion by id
    #[must_use]
    pub fn pending(&self, id: &SuggestionId) -> Option<ActionSuggestion> {
        self.state.lock().pending.get(id).cloned()
    }

    /// Execution record by id
    #[must_use]
    pub fn executed(&self, id: &SuggestionId) -> Option<ExecutedAction> {
        self.state.lock().executed.get(id).cloned()
    }

    /// Drop pending and executed entries older than `max_age`
    pub fn sweep_expired(&self, max_age: Duration) -> SweepReport {
        self.sweep_expired_at(max_age, Utc::now())
    }

    /// [`Self::sweep_expired`] with an explicit clock reading
    pub fn sweep_expired_at(&self, max_age: Duration, now: DateTime<Utc>) -> SweepReport {
        let mut state = self.state.lock();

        let pending_before = state.pending.len();
        state.pending.retain(|_, s| age(s.created_at, now) <= max_age);
        let executed_before = state.executed.len();
        state.executed.retain(|_, e| age(e.executed_at, now) <= max_age);

        SweepReport {
            expired_pending: pending_before - state.pending.len(),
            purged_executed: executed_before - state.executed.len(),
        }
    }

    /// Current store sizes
    #[must_use]
    pub fn stats(&self) -> LedgerStats {
        let state = self.state.lock();
        LedgerStats {
            pending: state.pending.len(),
            executed: state.executed.len(),
        }
    }

    /// Run [`Self::sweep_expired`] every `interval` until `cancel` fires
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        tracing::debug!("Action sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = self.sweep_expired(self.config.max_age);
                        if report.expired_pending + report.purged_executed > 0 {
                            tracing::info!(
                                "Swept {} expired suggestions, {} executed records",
                                report.expired_pending,
                                report.purged_executed
                            );
                        }
                    }
                }
            }
        })
    }
}

/// Elapsed time from `since` to `now`; zero if the clock went backwards
fn age(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

fn execution_message(suggestion: &ActionSuggestion) -> String {
    let payload = &suggestion.payload;
    match suggestion.kind {
        ActionKind::ScheduleCallback => match &payload.phone {
            Some(phone) => format!("Callback scheduled to {phone}"),
            None => "Callback scheduled".to_string(),
        },
        ActionKind::SendSms => match &payload.phone {
            Some(phone) => format!("SMS sent to {phone}"),
            None => "SMS sent".to_string(),
        },
        ActionKind::CreateTicket => match &payload.subject {
            Some(subject) => format!("Ticket created: {subject}"),
            None => "Ticket created".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    fn callback() -> ActionPayload {
        ActionPayload::default().with_phone("+46 8 123 45 67")
    }

    #[test]
    fn first_confirmation_executes() {
        let ledger = ActionLedger::default();
        let suggestion = ledger.create_suggestion(ActionKind::ScheduleCallback, callback());

        let result = ledger.confirm(&suggestion.id);
        assert!(result.success);
        assert_eq!(result.ignored, None);
        assert_eq!(result.message, "Callback scheduled to +46 8 123 45 67");
        assert!(ledger.pending(&suggestion.id).is_none());
        assert!(ledger.executed(&suggestion.id).is_some());
    }

    #[test]
    fn repeat_within_cooldown_is_ignored() {
        let ledger = ActionLedger::default();
        let t0 = Utc::now();
        let suggestion = ledger.create_suggestion_at(ActionKind::SendSms, callback(), t0);

        let first = ledger.confirm_at(&suggestion.id, t0);
        let second = ledger.confirm_at(&suggestion.id, t0 + TimeDelta::seconds(29));

        assert!(first.success && !first.is_ignored());
        assert!(second.success && second.is_ignored());
        assert_eq!(
            ledger.executed(&suggestion.id).unwrap().executed_at,
            t0,
            "repeat must not re-execute"
        );
    }

    #[test]
    fn repeat_after_cooldown_reports_not_found() {
        let ledger = ActionLedger::default();
        let t0 = Utc::now();
        let suggestion = ledger.create_suggestion_at(ActionKind::SendSms, callback(), t0);
        ledger.confirm_at(&suggestion.id, t0);

        let late = ledger.confirm_at(&suggestion.id, t0 + TimeDelta::seconds(31));
        assert!(!late.success);
        assert_eq!(late.message, "Action not found or expired");
    }

    #[test]
    fn unknown_id_fails() {
        let ledger = ActionLedger::default();
        let result = ledger.confirm(&SuggestionId::from("action_never"));
        assert!(!result.success);
        assert_eq!(result.suggestion_id.as_str(), "action_never");
    }

    #[test]
    fn messages_follow_kind() {
        let ledger = ActionLedger::default();
        let sms = ledger.create_suggestion(ActionKind::SendSms, ActionPayload::default());
        let ticket = ledger.create_suggestion(
            ActionKind::CreateTicket,
            ActionPayload::default().with_subject("Kundsupport"),
        );
        let bare_ticket = ledger.create_suggestion(ActionKind::CreateTicket, ActionPayload::default());

        assert_eq!(ledger.confirm(&sms.id).message, "SMS sent");
        assert_eq!(ledger.confirm(&ticket.id).message, "Ticket created: Kundsupport");
        assert_eq!(ledger.confirm(&bare_ticket.id).message, "Ticket created");
    }

    #[test]
    fn sweep_expires_old_pending_and_purges_old_executed() {
        let ledger = ActionLedger::default();
        let t0 = Utc::now();
        let stale = ledger.create_suggestion_at(ActionKind::SendSms, callback(), t0);
        let done = ledger.create_suggestion_at(ActionKind::SendSms, callback(), t0);
        ledger.confirm_at(&done.id, t0);
        let fresh = ledger.create_suggestion_at(ActionKind::SendSms, callback(), t0 + TimeDelta::seconds(200));

        let report = ledger.sweep_expired_at(DEFAULT_MAX_AGE, t0 + TimeDelta::seconds(301));

        assert_eq!(
            report,
            SweepReport {
                expired_pending: 1,
                purged_executed: 1,
            }
        );
        assert!(ledger.pending(&stale.id).is_none());
        assert!(ledger.pending(&fresh.id).is_some());
        assert!(!ledger.confirm_at(&stale.id, t0 + TimeDelta::seconds(302)).success);
    }

    #[test]
    fn sweep_keeps_entries_at_exactly_max_age() {
        let ledger = ActionLedger::default();
        let t0 = Utc::now();
        ledger.create_suggestion_at(ActionKind::SendSms, callback(), t0);
        let report = ledger.sweep_expired_at(Duration::from_secs(300), t0 + TimeDelta::seconds(300));
        assert_eq!(report.expired_pending, 0);
        assert_eq!(ledger.stats().pending, 1);
    }

    #[test]
    fn confirm_rejects_unswept_expired_suggestion() {
        let ledger = ActionLedger::default();
        let t0 = Utc::now();
        let stale = ledger.create_suggestion_at(ActionKind::SendSms, callback(), t0);
        let edge = ledger.create_suggestion_at(ActionKind::SendSms, callback(), t0);

        let late = ledger.confirm_at(&stale.id, t0 + TimeDelta::seconds(340));
        assert!(!late.success);
        assert_eq!(late.message, "Action not found or expired");
        assert!(ledger.pending(&stale.id).is_none());
        assert!(ledger.executed(&stale.id).is_none());

        // exactly max age is still confirmable, matching the sweeper
        assert!(ledger.confirm_at(&edge.id, t0 + TimeDelta::seconds(300)).success);
    }

    #[test]
    fn concurrent_confirmations_execute_once() {
        let ledger = Arc::new(ActionLedger::default());
        let suggestion = ledger.create_suggestion(ActionKind::ScheduleCallback, callback());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let id = suggestion.id.clone();
                std::thread::spawn(move || ledger.confirm(&id))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.iter().all(|r| r.success));
        assert_eq!(results.iter().filter(|r| !r.is_ignored()).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_until_cancelled() {
        let ledger = Arc::new(ActionLedger::new(LedgerConfig {
            cooldown: DEFAULT_COOLDOWN,
            max_age: Duration::ZERO,
        }));
        let past = Utc::now() - TimeDelta::seconds(5);
        ledger.create_suggestion_at(ActionKind::SendSms, callback(), past);

        let cancel = CancellationToken::new();
        let handle = Arc::clone(&ledger).spawn_sweeper(Duration::from_secs(60), cancel.clone());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(ledger.stats().pending, 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
