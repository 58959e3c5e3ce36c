//! Streaming session controller
//!
//! One controller per connection. It turns inbound events into outbound
//! events: user messages start a cancellable generation whose tokens are
//! forwarded as `stream` deltas, and whose completed answer passes through
//! the grounding verifier before the final `response`.
//!
//! Generations run as their own tasks so the connection keeps reading
//! (and can receive `cancel`) while tokens stream. Terminal events for a
//! generation are emitted under the session lock after re-checking that the
//! generation is still the active one; a superseded or cancelled generation
//! therefore never emits `response`.

use crate::error::GenerationError;
use crate::events::{InboundEvent, OutboundEvent, StreamEndReason};
use crate::generator::TokenGenerator;
use crate::session::{Session, SessionState};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use verity_actions::{ActionLedger, IntentDetector, SuggestionId};
use verity_grounding::GroundingVerifier;

/// Tokens buffered between generator and controller
const TOKEN_BUFFER: usize = 64;

/// Error text for frames that cannot be parsed
pub const MALFORMED_MESSAGE: &str = "Failed to process message";

/// Outbound event channel of one connection
pub type EventSink = mpsc::UnboundedSender<OutboundEvent>;

/// Process-wide collaborators shared by every session
pub struct SessionServices {
    /// Final-answer grounding check
    pub verifier: GroundingVerifier,
    /// Shared action stores
    pub ledger: Arc<ActionLedger>,
    /// Trigger-phrase detector
    pub detector: IntentDetector,
    /// Answer producer
    pub generator: Arc<dyn TokenGenerator>,
}

impl std::fmt::Debug for SessionServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionServices")
            .field("verifier", &self.verifier)
            .field("ledger", &self.ledger)
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

/// Drives one connection's session
#[derive(Debug)]
pub struct SessionController {
    services: Arc<SessionServices>,
    session: Arc<Mutex<Session>>,
    events: EventSink,
}

impl SessionController {
    /// Controller emitting onto `events`
    #[must_use]
    pub fn new(services: Arc<SessionServices>, events: EventSink) -> Self {
        Self {
            services,
            session: Arc::new(Mutex::new(Session::new())),
            events,
        }
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }

    /// Message id of the generation in flight
    #[must_use]
    pub fn active_message_id(&self) -> Option<String> {
        self.session.lock().active_message_id().map(str::to_string)
    }

    /// Handle one raw inbound frame; malformed frames produce an `error` event
    pub fn handle_frame(&self, frame: &str) {
        match InboundEvent::parse(frame) {
            Ok(event) => self.handle_event(event),
            Err(e) => {
                tracing::warn!("Dropping inbound frame: {}", e);
                emit(
                    &self.events,
                    OutboundEvent::Error {
                        message: MALFORMED_MESSAGE.to_string(),
                    },
                );
            }
        }
    }

    /// Handle one parsed inbound event
    pub fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Message { id, text } => {
                // runs detached; completion is reported through events
                drop(self.start_generation(id, text));
            }
            InboundEvent::Cancel => self.cancel(),
            InboundEvent::ConfirmAction { suggestion_id } => self.confirm_action(&suggestion_id),
        }
    }

    /// Start generating an answer to `text`, superseding any generation in flight.
    ///
    /// Emits an `action_suggestion` first if the text carries an action
    /// trigger. The returned handle resolves once the generation has emitted
    /// its terminal events (or was found stale).
    pub fn start_generation(&self, message_id: String, text: String) -> JoinHandle<()> {
        let cancel = CancellationToken::new();
        let sequence = {
            let mut session = self.session.lock();
            let (sequence, displaced) = session.begin(message_id.clone(), cancel.clone());
            if let Some(previous) = displaced {
                previous.cancel.cancel();
                tracing::debug!("Message {} supersedes {}", message_id, previous.message_id);
            }
            sequence
        };
        tracing::info!("Generating answer for message {}", message_id);

        if let Some(intent) = self.services.detector.detect(&text) {
            let suggestion = self
                .services
                .ledger
                .create_suggestion(intent.kind, intent.payload);
            emit(
                &self.events,
                OutboundEvent::ActionSuggestion {
                    suggestion_id: suggestion.id,
                    action: suggestion.kind,
                    payload: suggestion.payload,
                },
            );
        }

        let run = GenerationRun {
            services: Arc::clone(&self.services),
            session: Arc::clone(&self.session),
            events: self.events.clone(),
            sequence,
            message_id,
            prompt: text,
            cancel,
        };
        tokio::spawn(run.drive())
    }

    /// Cancel the generation in flight; no-op when idle
    pub fn cancel(&self) {
        let mut session = self.session.lock();
        match session.take_active() {
            Some(active) => {
                active.cancel.cancel();
                tracing::info!("Cancelled message {}", active.message_id);
                emit(
                    &self.events,
                    OutboundEvent::StreamEnd {
                        reason: StreamEndReason::Cancelled,
                    },
                );
            }
            None => tracing::debug!("Cancel with nothing in flight"),
        }
    }

    /// Confirm a suggested action and report the result
    pub fn confirm_action(&self, suggestion_id: &SuggestionId) {
        let result = self.services.ledger.confirm(suggestion_id);
        emit(
            &self.events,
            OutboundEvent::ActionExecuted {
                suggestion_id: suggestion_id.clone(),
                result,
            },
        );
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = self.session.lock().take_active() {
            tracing::debug!("Connection closed, abandoning message {}", active.message_id);
            active.cancel.cancel();
        }
    }
}

/// One generation, from first token to terminal events
struct GenerationRun {
    services: Arc<SessionServices>,
    session: Arc<Mutex<Session>>,
    events: EventSink,
    sequence: u64,
    message_id: String,
    prompt: String,
    cancel: CancellationToken,
}

impl GenerationRun {
    async fn drive(self) {
        let (tx, mut rx) = mpsc::channel::<String>(TOKEN_BUFFER);

        let produce = self
            .services
            .generator
            .generate(&self.prompt, tx, self.cancel.clone());

        let consume = async {
            let mut answer = String::new();
            loop {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => break,
                    token = rx.recv() => {
                        let Some(token) = token else { break };
                        let session = self.session.lock();
                        if !session.is_current(self.sequence) {
                            break;
                        }
                        answer.push_str(&token);
                        emit(&self.events, OutboundEvent::Stream { delta: token });
                    }
                }
            }
            // closing the channel tells the generator to stop
            drop(rx);
            answer
        };

        let (outcome, answer) = tokio::join!(produce, consume);
        self.finish(outcome, &answer);
    }

    fn finish(&self, outcome: Result<(), GenerationError>, answer: &str) {
        match outcome {
            Ok(()) => {
                if !self.session.lock().is_current(self.sequence) {
                    tracing::debug!("Discarding stale completion of message {}", self.message_id);
                    return;
                }

                let verdict = self.services.verifier.verify(answer.trim(), &self.prompt);

                let mut session = self.session.lock();
                if !session.finish(self.sequence) {
                    tracing::debug!("Message {} superseded during verification", self.message_id);
                    return;
                }
                tracing::info!(
                    "Message {} complete (grounded: {}, citations: {})",
                    self.message_id,
                    verdict.accepted,
                    verdict.citations.len()
                );
                emit(
                    &self.events,
                    OutboundEvent::StreamEnd {
                        reason: StreamEndReason::Done,
                    },
                );
                emit(
                    &self.events,
                    OutboundEvent::Response {
                        text: verdict.text,
                        citations: verdict.citations,
                    },
                );
            }
            Err(error) => {
                let mut session = self.session.lock();
                if !session.finish(self.sequence) {
                    tracing::debug!("Message {} ended after cancellation: {}", self.message_id, error);
                    return;
                }
                if error.is_cancellation() {
                    tracing::info!("Generation for message {} stopped by generator", self.message_id);
                    return;
                }
                tracing::warn!("Generation for message {} failed: {}", self.message_id, error);
                emit(
                    &self.events,
                    OutboundEvent::Error {
                        message: error.to_string(),
                    },
                );
            }
        }
    }
}

fn emit(events: &EventSink, event: OutboundEvent) {
    let kind = event.kind();
    if events.send(event).is_err() {
        tracing::trace!("Client gone, dropped {} event", kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use verity_corpus::{Corpus, CorpusConfig, Document, KnowledgeIndex, Lexicon};

    struct Echo;

    #[async_trait::async_trait]
    impl TokenGenerator for Echo {
        async fn generate(
            &self,
            prompt: &str,
            tokens: mpsc::Sender<String>,
            _cancel: CancellationToken,
        ) -> Result<(), GenerationError> {
            for word in prompt.split(' ') {
                tokens
                    .send(format!("{word} "))
                    .await
                    .map_err(|_| GenerationError::Cancelled)?;
            }
            Ok(())
        }
    }

    fn controller() -> (SessionController, mpsc::UnboundedReceiver<OutboundEvent>) {
        let corpus = Corpus::from_documents(vec![Document::new("kb/priser.md", "Basic kostar 99 kr")]);
        let index = Arc::new(KnowledgeIndex::new(corpus, Lexicon::builtin(), CorpusConfig::default()));
        let services = Arc::new(SessionServices {
            verifier: GroundingVerifier::new(index),
            ledger: Arc::new(ActionLedger::default()),
            detector: IntentDetector::new(),
            generator: Arc::new(Echo),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionController::new(services, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn streams_then_delivers_verified_response() {
        let (controller, mut rx) = controller();
        controller
            .start_generation("m1".into(), "Basic kostar 99".into())
            .await
            .unwrap();

        let events = drain(&mut rx);
        let deltas: String = events
            .iter()
            .filter_map(|e| match e {
                OutboundEvent::Stream { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, "Basic kostar 99 ");
        assert_eq!(
            &events[events.len() - 2..],
            &[
                OutboundEvent::StreamEnd {
                    reason: StreamEndReason::Done
                },
                OutboundEvent::Response {
                    text: "Basic kostar 99".into(),
                    citations: vec![verity_corpus::Citation::new("kb/priser.md", "Basic kostar 99 kr")],
                },
            ]
        );
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn malformed_frame_reports_error() {
        let (controller, mut rx) = controller();
        controller.handle_frame("{not json");
        assert_eq!(
            drain(&mut rx),
            vec![OutboundEvent::Error {
                message: MALFORMED_MESSAGE.into()
            }]
        );
    }

    #[tokio::test]
    async fn cancel_when_idle_is_silent() {
        let (controller, mut rx) = controller();
        controller.handle_event(InboundEvent::Cancel);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn trigger_emits_suggestion_before_tokens() {
        let (controller, mut rx) = controller();
        controller
            .start_generation("m1".into(), "ring mig".into())
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert!(matches!(events[0], OutboundEvent::ActionSuggestion { .. }));
        assert!(matches!(events[1], OutboundEvent::Stream { .. }));
    }
}
