//! HTTP and WebSocket surface
//!
//! - `GET /ws`: one session per socket; text frames carry JSON events
//! - `GET /health`: corpus and ledger counts
//! - `POST /reload`: re-read the knowledge base

use crate::config::Config;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, Stream, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;
use verity_actions::{ActionLedger, IntentDetector, LedgerStats};
use verity_corpus::{CorpusError, CorpusStats, KnowledgeIndex};
use verity_grounding::GroundingVerifier;
use verity_session::{OutboundEvent, ScriptedGenerator, SessionController, SessionServices};

/// Shared by every connection
#[derive(Debug)]
pub struct AppState {
    services: Arc<SessionServices>,
    next_connection: AtomicU64,
}

impl AppState {
    /// State over already-built services
    #[must_use]
    pub fn new(services: Arc<SessionServices>) -> Self {
        Self {
            services,
            next_connection: AtomicU64::new(0),
        }
    }

    /// Load the corpus and wire up the scripted generator
    ///
    /// # Errors
    /// `CorpusError` if the knowledge base cannot be loaded
    pub fn from_config(config: &Config) -> Result<Self, CorpusError> {
        let index = Arc::new(KnowledgeIndex::load(config.corpus.clone(), config.lexicon.clone())?);
        let services = SessionServices {
            verifier: GroundingVerifier::with_messages(index, config.grounding.clone()),
            ledger: Arc::new(ActionLedger::new(config.actions.ledger_config())),
            detector: IntentDetector::new().with_ticket_subject(config.actions.ticket_subject.clone()),
            generator: Arc::new(ScriptedGenerator::new(config.generator.clone())),
        };
        Ok(Self::new(Arc::new(services)))
    }

    /// Session collaborators
    #[inline]
    #[must_use]
    pub fn services(&self) -> &Arc<SessionServices> {
        &self.services
    }

    fn index(&self) -> &Arc<KnowledgeIndex> {
        self.services.verifier.index()
    }
}

/// Routes served by the endpoint
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/reload", post(reload))
        .with_state(state)
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Always `"ok"` when the endpoint answers
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Active corpus
    pub corpus: CorpusStats,
    /// Ledger sizes
    pub actions: LedgerStats,
}

/// Error body for failed admin calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Description
    pub error: String,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        version: crate::VERSION,
        corpus: state.index().stats(),
        actions: state.services.ledger.stats(),
    })
}

/// `POST /reload`: swap in a freshly loaded corpus, keeping the old one on failure
///
/// # Errors
/// `500` with the load error; the previous corpus stays active
pub async fn reload(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CorpusStats>, (StatusCode, Json<ErrorBody>)> {
    let index = Arc::clone(state.index());
    let outcome = tokio::task::spawn_blocking(move || index.reload()).await;

    let failure = |error: String| {
        tracing::error!("Corpus reload failed: {}", error);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error }))
    };

    match outcome {
        Ok(Ok(stats)) => Ok(Json(stats)),
        Ok(Err(e)) => Err(failure(e.to_string())),
        Err(e) => Err(failure(e.to_string())),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection = state.next_connection.fetch_add(1, Ordering::Relaxed) + 1;
    let span = tracing::info_span!("session", connection);

    async move {
        tracing::info!("Connection opened");
        let (mut ws_sender, ws_receiver) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEvent>();

        let send_task = tokio::spawn(
            async move {
                while let Some(event) = rx.recv().await {
                    let payload = match event.to_json() {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!("Failed to encode {} event: {}", event.kind(), e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        let controller = SessionController::new(Arc::clone(&state.services), tx);
        pump_frames(&controller, ws_receiver).await;

        // cancels whatever is still generating
        drop(controller);
        send_task.abort();
        tracing::info!("Connection closed");
    }
    .instrument(span)
    .await;
}

/// Feed inbound socket messages to `controller` until the peer closes.
///
/// Text frames are events; pings, pongs and binary frames are ignored.
pub async fn pump_frames<S, E>(controller: &SessionController, mut frames: S)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Message::Text(text)) => controller.handle_frame(&text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!("WebSocket receive failed: {}", e);
                break;
            }
        }
    }
}
