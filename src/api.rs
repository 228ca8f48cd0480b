use crate::error::TransportError;
use crate::protocol::{
    AutoApproveResponse, ChatReply, ChatRequest, Confirmation, ConfirmationRequest,
    DocumentUpdate, ExecutePlanRequest, FixErrorRequest, IndexResponse, StateUpdate,
    StatusReport, Turn,
};
use crate::transport::{Payload, StreamHandle, Transport};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// The three shapes `/chat` and `/fix_error` may answer with.
pub enum ChatResponse {
    Reply(String),
    History(Vec<Turn>),
    Stream(StreamHandle),
}

impl std::fmt::Debug for ChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatResponse::Reply(text) => f.debug_tuple("Reply").field(text).finish(),
            ChatResponse::History(turns) => f.debug_tuple("History").field(turns).finish(),
            ChatResponse::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Scratchpad,
    MainPlan,
}

impl DocumentKind {
    pub fn path(self) -> &'static str {
        match self {
            DocumentKind::Scratchpad => "/scratchpad",
            DocumentKind::MainPlan => "/main_plan",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Scratchpad => "Scratchpad",
            DocumentKind::MainPlan => "Main plan",
        }
    }
}

/// Typed calls over the backend's HTTP surface.
pub struct Backend<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: ?Sized> Clone for Backend<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport + ?Sized> Backend<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn models(&self) -> Result<Vec<String>, TransportError> {
        self.get_json("/models").await
    }

    pub async fn document(&self, kind: DocumentKind) -> Result<String, TransportError> {
        self.transport.fetch_text(kind.path()).await
    }

    pub async fn save_document(
        &self,
        kind: DocumentKind,
        content: &str,
    ) -> Result<(), TransportError> {
        self.post(kind.path(), &DocumentUpdate { content }).await
    }

    pub async fn update_state(
        &self,
        main_plan: &str,
        scratchpad: &str,
    ) -> Result<(), TransportError> {
        self.post(
            "/update_state",
            &StateUpdate {
                main_plan,
                scratchpad,
            },
        )
        .await
    }

    pub async fn chat(
        &self,
        model: &str,
        message: &str,
        history: &[Turn],
    ) -> Result<ChatResponse, TransportError> {
        let request = ChatRequest {
            model,
            message,
            conversation_history: history,
        };
        self.converse("/chat", to_body("/chat", &request)?).await
    }

    pub async fn fix_error(
        &self,
        model: &str,
        error_message: &str,
        history: &[Turn],
    ) -> Result<ChatResponse, TransportError> {
        let request = FixErrorRequest {
            model,
            error_message,
            conversation_history: history,
        };
        self.converse("/fix_error", to_body("/fix_error", &request)?).await
    }

    pub async fn index(&self) -> Result<IndexResponse, TransportError> {
        let value = self.transport.send(Method::POST, "/index", None).await?;
        parse("/index", value)
    }

    pub async fn execute_plan(&self, goal: &str, model: &str) -> Result<(), TransportError> {
        self.post("/execute_plan", &ExecutePlanRequest { goal, model })
            .await
    }

    pub async fn stop_agent(&self) -> Result<(), TransportError> {
        self.transport
            .send(Method::POST, "/stop_agent", None)
            .await
            .map(drop)
    }

    pub async fn status(&self) -> Result<StatusReport, TransportError> {
        self.get_json("/status").await
    }

    pub async fn respond_to_confirmation(
        &self,
        response: Confirmation,
    ) -> Result<(), TransportError> {
        self.post(
            "/respond_to_confirmation",
            &ConfirmationRequest { response },
        )
        .await
    }

    pub async fn toggle_auto_approve(&self) -> Result<bool, TransportError> {
        let value = self
            .transport
            .send(Method::POST, "/toggle_auto_approve", None)
            .await?;
        parse::<AutoApproveResponse>("/toggle_auto_approve", value)
            .map(|response| response.auto_approve)
    }

    async fn converse(&self, path: &str, body: Value) -> Result<ChatResponse, TransportError> {
        match self.transport.exchange(Method::POST, path, Some(body)).await? {
            Payload::Stream(stream) => Ok(ChatResponse::Stream(stream)),
            Payload::Json(value) => chat_reply(path, value),
            Payload::Text(text) => {
                let value =
                    serde_json::from_str(&text).map_err(|err| TransportError::body(path, err))?;
                chat_reply(path, value)
            }
        }
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, TransportError> {
        let value = self.transport.send(Method::GET, path, None).await?;
        parse(path, value)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), TransportError> {
        self.transport
            .send(Method::POST, path, Some(to_body(path, body)?))
            .await
            .map(drop)
    }
}

fn chat_reply(path: &str, value: Value) -> Result<ChatResponse, TransportError> {
    match parse::<ChatReply>(path, value)? {
        ChatReply::History { history } => Ok(ChatResponse::History(history)),
        ChatReply::Response { response } => Ok(ChatResponse::Reply(response)),
    }
}

fn parse<R: DeserializeOwned>(path: &str, value: Value) -> Result<R, TransportError> {
    serde_json::from_value(value).map_err(|err| TransportError::body(path, err))
}

fn to_body<B: Serialize>(path: &str, body: &B) -> Result<Value, TransportError> {
    serde_json::to_value(body).map_err(|err| TransportError::body(path, err))
}
