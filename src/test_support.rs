//! In-memory and loopback backends for unit tests.

use crate::error::TransportError;
use crate::transport::{Payload, Transport};
use async_trait::async_trait;
use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::StreamExt;
use futures::stream;
use reqwest::Method;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Json(Value),
    Text(String),
    Stream(Vec<String>),
    /// Fragments followed by a mid-stream failure.
    BrokenStream(Vec<String>),
    Status(u16, String),
}

/// Answers each path from a queue; the last entry of a queue repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, path: &str, response: Scripted) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    fn next(&self, path: &str) -> Option<Scripted> {
        let mut scripts = self.scripts.lock().expect("scripts lock");
        let queue = scripts.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Payload, TransportError> {
        self.requests.lock().expect("requests lock").push(RecordedRequest {
            method,
            path: path.to_string(),
            body,
        });

        let failure = |code: u16, body: &str| TransportError::Status {
            path: path.to_string(),
            status: reqwest::StatusCode::from_u16(code).expect("valid status"),
            body: body.to_string(),
        };

        match self.next(path) {
            None => Ok(Payload::Json(json!({"status": "ok"}))),
            Some(Scripted::Json(value)) => Ok(Payload::Json(value)),
            Some(Scripted::Text(text)) => Ok(Payload::Text(text)),
            Some(Scripted::Stream(fragments)) => Ok(Payload::Stream(
                stream::iter(fragments.into_iter().map(Ok)).boxed(),
            )),
            Some(Scripted::BrokenStream(fragments)) => {
                let broken = failure(502, "stream interrupted");
                Ok(Payload::Stream(
                    stream::iter(fragments.into_iter().map(Ok))
                        .chain(stream::once(async move { Err(broken) }))
                        .boxed(),
                ))
            }
            Some(Scripted::Status(code, body)) => Err(failure(code, &body)),
        }
    }
}

#[derive(Default)]
struct StubState {
    scratchpad: String,
    main_plan: String,
    agent_running: bool,
    auto_approve: bool,
}

type Shared = Arc<Mutex<StubState>>;

/// A loopback HTTP backend speaking the real wire formats.
pub struct StubBackend {
    pub base_url: String,
}

impl StubBackend {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubState {
            scratchpad: "notes".to_string(),
            main_plan: "plan".to_string(),
            ..StubState::default()
        }));

        let app = axum::Router::new()
            .route("/models", get(models))
            .route("/scratchpad", get(get_scratchpad).post(set_scratchpad))
            .route("/main_plan", get(get_main_plan).post(set_main_plan))
            .route("/chat", post(chat))
            .route("/fix_error", post(fix_error))
            .route("/index", post(index))
            .route("/execute_plan", post(execute_plan))
            .route("/stop_agent", post(stop_agent))
            .route("/status", get(status))
            .route("/respond_to_confirmation", post(respond_to_confirmation))
            .route("/toggle_auto_approve", post(toggle_auto_approve))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub backend");
        let addr = listener.local_addr().expect("stub backend address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
        }
    }
}

async fn models() -> Json<Value> {
    Json(json!(["gemini-1.5-flash", "gemini-1.5-pro"]))
}

async fn get_scratchpad(State(state): State<Shared>) -> String {
    state.lock().expect("stub lock").scratchpad.clone()
}

async fn set_scratchpad(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().expect("stub lock").scratchpad = content(&body);
    Json(json!({"status": "ok"}))
}

async fn get_main_plan(State(state): State<Shared>) -> String {
    state.lock().expect("stub lock").main_plan.clone()
}

async fn set_main_plan(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().expect("stub lock").main_plan = content(&body);
    Json(json!({"status": "ok"}))
}

fn content(body: &Value) -> String {
    body["content"].as_str().unwrap_or_default().to_string()
}

// Frames deliberately straddle body chunks.
async fn chat() -> Response {
    let fragments = stream::iter(vec![
        Ok::<_, Infallible>("data: {\"chunk\":\"H"),
        Ok("i\"}\n"),
        Ok("\ndata: {\"chunk\":\" there\"}\n\n"),
    ]);
    (
        [(CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(fragments),
    )
        .into_response()
}

async fn fix_error(Json(body): Json<Value>) -> Json<Value> {
    let mut history = body["conversation_history"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    history.push(json!({"role": "model", "parts": [{"text": "fixed"}]}));
    Json(json!({"history": history}))
}

async fn index() -> Json<Value> {
    Json(json!({"status": "success"}))
}

async fn execute_plan(State(state): State<Shared>) -> (StatusCode, Json<Value>) {
    state.lock().expect("stub lock").agent_running = true;
    (StatusCode::ACCEPTED, Json(json!({"status": "Agent started."})))
}

async fn stop_agent(State(state): State<Shared>) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().expect("stub lock");
    if !state.agent_running {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Agent is not running."})),
        );
    }
    state.agent_running = false;
    (StatusCode::OK, Json(json!({"status": "Agent stopped."})))
}

async fn status(State(state): State<Shared>) -> Json<Value> {
    let state = state.lock().expect("stub lock");
    Json(json!({
        "scratchpad": state.scratchpad,
        "main_plan": state.main_plan,
        "agent_running": state.agent_running,
        "agent_status": if state.agent_running { "running" } else { "stopped" },
        "confirmation_prompt": "",
        "auto_approve": state.auto_approve,
    }))
}

async fn respond_to_confirmation(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match body["response"].as_str() {
        Some("approve") | Some("deny") => (
            StatusCode::OK,
            Json(json!({"status": "Response received."})),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid response."})),
        ),
    }
}

async fn toggle_auto_approve(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().expect("stub lock");
    state.auto_approve = !state.auto_approve;
    Json(json!({"auto_approve": state.auto_approve}))
}
