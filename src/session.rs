use crate::api::{Backend, ChatResponse};
use crate::conversation::{Conversation, StreamAccumulator};
use crate::error::{TransportError, ValidationError};
use crate::protocol::Turn;
use crate::sse::decode_stream;
use crate::transport::{StreamHandle, Transport};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply,
    Streaming,
}

/// What the view needs to know, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    TurnAppended(Turn),
    HistoryReplaced(Vec<Turn>),
    StreamStarted,
    /// The whole reply accumulated so far, not the delta.
    StreamUpdated(String),
    StreamCommitted(Turn),
    StreamFailed(String),
    /// A request failed; rendered as an error turn.
    Error(String),
    Warning(String),
}

struct SessionInner {
    conversation: Conversation,
    state: SessionState,
    model: Option<String>,
}

/// Drives send/receive cycles for the single conversation of a session.
pub struct SessionController<T: ?Sized> {
    backend: Backend<T>,
    inner: Arc<Mutex<SessionInner>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<T: ?Sized> Clone for SessionController<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
        }
    }
}

impl<T: Transport + ?Sized> SessionController<T> {
    pub fn new(
        backend: Backend<T>,
        model: Option<String>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            backend,
            inner: Arc::new(Mutex::new(SessionInner {
                conversation: Conversation::new(),
                state: SessionState::Idle,
                model,
            })),
            events,
        };
        (controller, receiver)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.inner.lock().await.conversation.turns().to_vec()
    }

    pub async fn model(&self) -> Option<String> {
        self.inner.lock().await.model.clone()
    }

    pub async fn set_model(&self, model: impl Into<String>) {
        self.inner.lock().await.model = Some(model.into());
    }

    /// Fetch the backend's models, adopting the first one if none is selected.
    pub async fn load_models(&self) -> Result<Vec<String>, TransportError> {
        let models = self.backend.models().await?;
        let mut inner = self.inner.lock().await;
        if inner.model.is_none() {
            inner.model = models.first().cloned();
        }
        Ok(models)
    }

    pub async fn index_codebase(&self) -> Result<bool, TransportError> {
        let response = self.backend.index().await?;
        if let Some(error) = &response.error {
            warn!(error, "indexing failed");
        }
        Ok(response.succeeded())
    }

    /// Send a user message. Empty input is a silent no-op.
    ///
    /// Transport failures are rendered as an error turn rather than returned.
    pub async fn send(&self, message: &str) -> Result<(), ValidationError> {
        if message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let (model, history) = {
            let mut inner = self.inner.lock().await;
            let model = self.admit(&inner)?;
            let turn = Turn::user(message);
            inner.conversation.append(turn.clone());
            self.emit(SessionEvent::TurnAppended(turn));
            self.enter(&mut inner, SessionState::AwaitingReply);
            (model, inner.conversation.prior_turns().to_vec())
        };

        debug!(model, turns = history.len(), "sending chat message");
        let response = self.backend.chat(&model, message, &history).await;
        self.settle(response).await;
        Ok(())
    }

    /// Ask the backend to repair its last reply, sending the full history.
    pub async fn fix_error(&self, description: &str) -> Result<(), ValidationError> {
        let (model, history) = {
            let mut inner = self.inner.lock().await;
            let model = self.admit(&inner)?;
            if !inner.conversation.ends_with_model_turn() {
                return Err(self.reject(ValidationError::NoModelTurnToFix));
            }
            if description.trim().is_empty() {
                return Err(self.reject(ValidationError::EmptyErrorDescription));
            }
            self.enter(&mut inner, SessionState::AwaitingReply);
            (model, inner.conversation.turns().to_vec())
        };

        debug!(model, turns = history.len(), "requesting error fix");
        let response = self.backend.fix_error(&model, description, &history).await;
        self.settle(response).await;
        Ok(())
    }

    // One request in flight per session.
    fn admit(&self, inner: &SessionInner) -> Result<String, ValidationError> {
        if inner.state != SessionState::Idle {
            return Err(self.reject(ValidationError::RequestInFlight));
        }
        inner
            .model
            .clone()
            .ok_or_else(|| self.reject(ValidationError::NoModel))
    }

    async fn settle(&self, response: Result<ChatResponse, TransportError>) {
        match response {
            Ok(ChatResponse::Reply(text)) => {
                let turn = Turn::model(text);
                self.inner.lock().await.conversation.append(turn.clone());
                self.emit(SessionEvent::TurnAppended(turn));
            }
            Ok(ChatResponse::History(turns)) => {
                info!(turns = turns.len(), "server replaced conversation history");
                self.inner.lock().await.conversation.replace_all(turns.clone());
                self.emit(SessionEvent::HistoryReplaced(turns));
            }
            Ok(ChatResponse::Stream(fragments)) => self.consume_stream(fragments).await,
            Err(err) => {
                warn!(error = %err, "chat request failed");
                self.emit(SessionEvent::Error(format!("Error: {err}")));
            }
        }

        let mut inner = self.inner.lock().await;
        self.enter(&mut inner, SessionState::Idle);
    }

    async fn consume_stream(&self, fragments: StreamHandle) {
        {
            let mut inner = self.inner.lock().await;
            self.enter(&mut inner, SessionState::Streaming);
        }
        self.emit(SessionEvent::StreamStarted);

        let mut accumulator = StreamAccumulator::new();
        let mut chunks = Box::pin(decode_stream(fragments));
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    let text = accumulator.push(&chunk.chunk).to_string();
                    self.emit(SessionEvent::StreamUpdated(text));
                }
                Err(err) => {
                    warn!(error = %err, received = accumulator.text().len(), "reply stream failed");
                    self.emit(SessionEvent::StreamFailed(format!("Error: {err}")));
                    return;
                }
            }
        }

        debug!(updates = accumulator.updates(), "reply stream finished");
        let turn = accumulator.into_turn();
        self.inner.lock().await.conversation.append(turn.clone());
        self.emit(SessionEvent::StreamCommitted(turn));
    }

    fn enter(&self, inner: &mut SessionInner, state: SessionState) {
        if inner.state != state {
            inner.state = state;
            self.emit(SessionEvent::StateChanged(state));
        }
    }

    fn reject(&self, err: ValidationError) -> ValidationError {
        self.emit(SessionEvent::Warning(err.to_string()));
        err
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
