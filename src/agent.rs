use crate::api::Backend;
use crate::documents::SharedDocuments;
use crate::error::{ClientError, ClientResult, TransportError, ValidationError};
use crate::protocol::Confirmation;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StatusChanged(AgentStatus),
    /// The server's free-form status text, reported on every poll.
    Progress(String),
    DocumentsRefreshed,
    ConfirmationRequested(String),
    /// The server reported the run finished. Sent once per run.
    Completed,
    Stopped,
    PollFailed(String),
    Warning(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Running,
    Finished,
}

struct RunState {
    status: AgentStatus,
    poll: Option<JoinHandle<()>>,
    last_prompt: Option<String>,
}

/// Launches the server-side agent and mirrors its progress by polling.
pub struct AgentRunController<T: ?Sized> {
    backend: Backend<T>,
    documents: SharedDocuments<T>,
    interval: Duration,
    state: Arc<Mutex<RunState>>,
    events: mpsc::UnboundedSender<AgentEvent>,
}

impl<T: ?Sized> Clone for AgentRunController<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            documents: self.documents.clone(),
            interval: self.interval,
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        }
    }
}

impl<T: Transport + ?Sized + 'static> AgentRunController<T> {
    pub fn new(
        backend: Backend<T>,
        documents: SharedDocuments<T>,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            backend,
            documents,
            interval,
            state: Arc::new(Mutex::new(RunState {
                status: AgentStatus::Idle,
                poll: None,
                last_prompt: None,
            })),
            events,
        };
        (controller, receiver)
    }

    pub async fn status(&self) -> AgentStatus {
        self.state.lock().await.status
    }

    pub async fn is_polling(&self) -> bool {
        self.state.lock().await.poll.is_some()
    }

    /// Launch a run for `goal` and start polling its status.
    pub async fn start(&self, goal: &str, model: &str) -> ClientResult<()> {
        if goal.trim().is_empty() {
            return Err(self.reject(ValidationError::EmptyGoal).into());
        }
        if self.status().await == AgentStatus::Running {
            return Err(self.reject(ValidationError::AgentAlreadyRunning).into());
        }

        // The acknowledgement body carries nothing we use.
        self.backend.execute_plan(goal, model).await?;
        info!(goal, model, "agent run launched");

        let mut state = self.state.lock().await;
        if let Some(stale) = state.poll.take() {
            stale.abort();
        }
        state.status = AgentStatus::Running;
        state.last_prompt = None;
        state.poll = Some(self.spawn_poller());
        self.emit(AgentEvent::StatusChanged(AgentStatus::Running));
        Ok(())
    }

    /// Stop observing the run and ask the server to halt it.
    ///
    /// The local state is idle when this returns, whatever the server says.
    pub async fn stop(&self) -> ClientResult<()> {
        self.halt_polling(AgentEvent::Stopped).await;
        self.backend.stop_agent().await.map_err(|err| {
            warn!(error = %err, "stop request failed");
            ClientError::from(err)
        })
    }

    /// Drop the poll task without contacting the server.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        if let Some(poll) = state.poll.take() {
            poll.abort();
        }
        state.status = AgentStatus::Idle;
    }

    /// One status fetch. Documents are refreshed even after the run ended so
    /// its final output lands exactly once more.
    pub async fn poll_once(&self) -> Result<PollOutcome, TransportError> {
        let report = self.backend.status().await?;
        self.documents.refresh(&report);
        self.emit(AgentEvent::DocumentsRefreshed);

        if let Some(text) = report.agent_status.as_deref().filter(|text| !text.is_empty()) {
            self.emit(AgentEvent::Progress(text.to_string()));
        }

        let prompt = report
            .confirmation_prompt
            .filter(|prompt| !prompt.trim().is_empty());
        {
            let mut state = self.state.lock().await;
            if prompt != state.last_prompt {
                if let Some(prompt) = &prompt {
                    self.emit(AgentEvent::ConfirmationRequested(prompt.clone()));
                }
                state.last_prompt = prompt;
            }
        }

        if report.agent_running {
            return Ok(PollOutcome::Running);
        }

        self.halt_polling(AgentEvent::Completed).await;
        Ok(PollOutcome::Finished)
    }

    pub async fn respond_to_confirmation(&self, answer: &str) -> ClientResult<()> {
        let confirmation: Confirmation = answer.parse().map_err(|err| self.reject(err))?;
        self.backend.respond_to_confirmation(confirmation).await?;
        self.state.lock().await.last_prompt = None;
        Ok(())
    }

    pub async fn toggle_auto_approve(&self) -> ClientResult<bool> {
        Ok(self.backend.toggle_auto_approve().await?)
    }

    // Clears the timer and goes idle; `notice` is sent only on an actual
    // running -> idle transition.
    async fn halt_polling(&self, notice: AgentEvent) {
        let poll = {
            let mut state = self.state.lock().await;
            let poll = state.poll.take();
            if state.status == AgentStatus::Running {
                state.status = AgentStatus::Idle;
                self.emit(AgentEvent::StatusChanged(AgentStatus::Idle));
                self.emit(notice);
            }
            poll
        };
        if let Some(poll) = poll {
            poll.abort();
        }
    }

    fn spawn_poller(&self) -> JoinHandle<()> {
        let controller = self.clone();
        let period = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match controller.poll_once().await {
                    Ok(PollOutcome::Running) => {}
                    Ok(PollOutcome::Finished) => {
                        debug!("agent run finished; poller exiting");
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "status poll failed");
                        controller.emit(AgentEvent::PollFailed(err.to_string()));
                    }
                }
            }
        })
    }

    fn reject(&self, err: ValidationError) -> ValidationError {
        self.emit(AgentEvent::Warning(err.to_string()));
        err
    }

    fn emit(&self, event: AgentEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DocumentKind;
    use crate::documents::SaveMode;
    use crate::test_support::{Scripted, ScriptedTransport};
    use serde_json::json;

    fn controller(
        transport: &Arc<ScriptedTransport>,
        interval: Duration,
    ) -> (
        AgentRunController<ScriptedTransport>,
        mpsc::UnboundedReceiver<AgentEvent>,
    ) {
        let backend = Backend::new(Arc::clone(transport));
        let documents = SharedDocuments::new(backend.clone(), SaveMode::OnBlur);
        AgentRunController::new(backend, documents, interval)
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }

    fn count(events: &[AgentEvent], wanted: &AgentEvent) -> usize {
        events.iter().filter(|event| *event == wanted).count()
    }

    #[tokio::test]
    async fn empty_goal_is_rejected_without_a_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let (agent, mut events) = controller(&transport, Duration::from_secs(60));

        let err = agent.start("  ", "gemini-1.5-flash").await.expect_err("empty goal");

        assert!(matches!(err, ClientError::Validation(ValidationError::EmptyGoal)));
        assert!(transport.requests().is_empty());
        assert_eq!(
            drain(&mut events),
            vec![AgentEvent::Warning("goal is empty".to_string())]
        );
        assert_eq!(agent.status().await, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn completion_is_surfaced_exactly_once() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(
            "/status",
            Scripted::Json(json!({
                "agent_running": false,
                "agent_status": "stopped",
                "scratchpad": "all tests pass",
                "main_plan": "done",
            })),
        );
        let (agent, mut events) = controller(&transport, Duration::from_secs(60));

        agent
            .start("refactor module X", "gemini-1.5-flash")
            .await
            .expect("start");
        assert_eq!(agent.status().await, AgentStatus::Running);
        assert!(agent.is_polling().await);
        let requests = transport.requests_to("/execute_plan");
        assert_eq!(
            requests[0].body,
            Some(json!({"goal": "refactor module X", "model": "gemini-1.5-flash"}))
        );

        assert_eq!(agent.poll_once().await.expect("poll"), PollOutcome::Finished);
        assert_eq!(agent.poll_once().await.expect("poll"), PollOutcome::Finished);

        let events = drain(&mut events);
        assert_eq!(count(&events, &AgentEvent::Completed), 1);
        assert_eq!(
            count(&events, &AgentEvent::StatusChanged(AgentStatus::Idle)),
            1
        );
        assert_eq!(count(&events, &AgentEvent::DocumentsRefreshed), 2);
        assert_eq!(agent.status().await, AgentStatus::Idle);
        assert!(!agent.is_polling().await);
        assert_eq!(
            agent.documents.get(DocumentKind::Scratchpad).content,
            "all tests pass"
        );
    }

    #[tokio::test]
    async fn poller_runs_until_the_server_reports_completion() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(
            "/status",
            Scripted::Json(json!({
                "agent_running": true,
                "agent_status": "running",
                "main_plan": "step 1",
            })),
        );
        transport.script(
            "/status",
            Scripted::Json(json!({
                "agent_running": true,
                "agent_status": "running",
                "main_plan": "step 2",
            })),
        );
        transport.script(
            "/status",
            Scripted::Json(json!({
                "agent_running": false,
                "agent_status": "stopped",
                "main_plan": "step 3",
            })),
        );
        let (agent, mut events) = controller(&transport, Duration::from_millis(10));

        agent
            .start("refactor module X", "gemini-1.5-flash")
            .await
            .expect("start");

        let mut seen = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = events.recv().await {
                let done = event == AgentEvent::Completed;
                seen.push(event);
                if done {
                    break;
                }
            }
        })
        .await
        .expect("run completes");

        assert_eq!(agent.status().await, AgentStatus::Idle);
        assert_eq!(agent.documents.get(DocumentKind::MainPlan).content, "step 3");
        assert_eq!(count(&seen, &AgentEvent::Completed), 1);

        let polls = transport.requests_to("/status").len();
        assert_eq!(polls, 3);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.requests_to("/status").len(), polls);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn stop_goes_idle_even_when_the_server_refuses() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(
            "/stop_agent",
            Scripted::Status(400, "Agent is not running.".to_string()),
        );
        let (agent, mut events) = controller(&transport, Duration::from_secs(60));
        agent
            .start("refactor module X", "gemini-1.5-flash")
            .await
            .expect("start");

        assert!(agent.stop().await.is_err());

        assert_eq!(agent.status().await, AgentStatus::Idle);
        assert!(!agent.is_polling().await);
        let events = drain(&mut events);
        assert_eq!(count(&events, &AgentEvent::Stopped), 1);
        assert_eq!(count(&events, &AgentEvent::Completed), 0);
        assert_eq!(transport.requests_to("/stop_agent").len(), 1);
    }

    #[tokio::test]
    async fn confirmation_prompt_is_announced_once_per_prompt() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(
            "/status",
            Scripted::Json(json!({"agent_running": true, "confirmation_prompt": "Delete build/?"})),
        );
        let (agent, mut events) = controller(&transport, Duration::from_secs(60));

        agent.poll_once().await.expect("poll");
        agent.poll_once().await.expect("poll");
        agent.respond_to_confirmation("approve").await.expect("approve");

        let events = drain(&mut events);
        assert_eq!(
            count(
                &events,
                &AgentEvent::ConfirmationRequested("Delete build/?".to_string())
            ),
            1
        );
        let answers = transport.requests_to("/respond_to_confirmation");
        assert_eq!(answers[0].body, Some(json!({"response": "approve"})));
    }

    #[tokio::test]
    async fn invalid_confirmation_is_rejected_locally() {
        let transport = Arc::new(ScriptedTransport::new());
        let (agent, _events) = controller(&transport, Duration::from_secs(60));

        let err = agent
            .respond_to_confirmation("sure")
            .await
            .expect_err("invalid answer");

        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::InvalidConfirmation(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn launch_failure_leaves_the_agent_idle() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(
            "/execute_plan",
            Scripted::Status(400, "Agent is already running.".to_string()),
        );
        let (agent, _events) = controller(&transport, Duration::from_secs(60));

        assert!(agent.start("refactor", "gemini-1.5-flash").await.is_err());
        assert_eq!(agent.status().await, AgentStatus::Idle);
        assert!(!agent.is_polling().await);
    }
}
