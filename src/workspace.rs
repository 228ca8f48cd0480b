use crate::agent::{AgentEvent, AgentRunController};
use crate::api::Backend;
use crate::config::Config;
use crate::documents::SharedDocuments;
use crate::error::TransportError;
use crate::session::{SessionController, SessionEvent};
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Everything one client session owns: the conversation, the agent run, and
/// the shared documents, all over one transport.
pub struct Workspace {
    pub session: SessionController<dyn Transport>,
    pub agent: AgentRunController<dyn Transport>,
    pub documents: SharedDocuments<dyn Transport>,
    pub models: Vec<String>,
}

pub struct WorkspaceEvents {
    pub session: mpsc::UnboundedReceiver<SessionEvent>,
    pub agent: mpsc::UnboundedReceiver<AgentEvent>,
}

impl Workspace {
    pub fn connect(config: &Config) -> Result<(Self, WorkspaceEvents), TransportError> {
        let transport = HttpTransport::new(&config.base_url, config.stream)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> (Self, WorkspaceEvents) {
        let backend = Backend::new(transport);
        let documents = SharedDocuments::new(backend.clone(), config.doc_save);
        let (session, session_events) =
            SessionController::new(backend.clone(), config.model.clone());
        let (agent, agent_events) =
            AgentRunController::new(backend, documents.clone(), config.poll_interval());

        let workspace = Self {
            session,
            agent,
            documents,
            models: Vec::new(),
        };
        let events = WorkspaceEvents {
            session: session_events,
            agent: agent_events,
        };
        (workspace, events)
    }

    /// Initial fetch of the model list and both documents. Failures are
    /// returned as messages so the client can still start.
    pub async fn bootstrap(&mut self) -> Vec<String> {
        let mut failures = Vec::new();

        match self.session.load_models().await {
            Ok(models) => self.models = models,
            Err(err) => {
                warn!(error = %err, "could not load models");
                failures.push(format!("Could not load models: {err}"));
            }
        }
        if let Err(err) = self.documents.load().await {
            warn!(error = %err, "could not load documents");
            failures.push(format!("Could not load scratchpad and plan: {err}"));
        }

        failures
    }
}
