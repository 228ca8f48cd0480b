use crate::error::TransportError;
use async_trait::async_trait;
use futures::StreamExt;
use futures::future;
use futures::stream::{self, BoxStream};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method, Url};
use serde_json::Value;
use tracing::debug;

/// Raw text fragments in arrival order; ends when the server closes the body.
pub type StreamHandle = BoxStream<'static, Result<String, TransportError>>;

/// A response body, tagged by the shape the server chose to answer with.
pub enum Payload {
    Json(Value),
    Text(String),
    Stream(StreamHandle),
}

impl Payload {
    fn shape(&self) -> &'static str {
        match self {
            Payload::Json(_) => "json",
            Payload::Text(_) => "text",
            Payload::Stream(_) => "stream",
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Payload::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Payload::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Payload, TransportError>;

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        match self.exchange(method, path, body).await? {
            Payload::Json(value) => Ok(value),
            Payload::Text(text) if text.trim().is_empty() => Ok(Value::Null),
            Payload::Text(text) => {
                serde_json::from_str(&text).map_err(|err| TransportError::body(path, err))
            }
            other => Err(TransportError::UnexpectedShape {
                path: path.to_string(),
                found: other.shape(),
            }),
        }
    }

    async fn open_stream(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<StreamHandle, TransportError> {
        match self.exchange(method, path, body).await? {
            Payload::Stream(stream) => Ok(stream),
            Payload::Text(text) => Ok(stream::once(future::ready(Ok(text))).boxed()),
            other => Err(TransportError::UnexpectedShape {
                path: path.to_string(),
                found: other.shape(),
            }),
        }
    }

    async fn fetch_text(&self, path: &str) -> Result<String, TransportError> {
        match self.exchange(Method::GET, path, None).await? {
            Payload::Text(text) => Ok(text),
            Payload::Json(Value::String(text)) => Ok(text),
            Payload::Json(Value::Null) => Ok(String::new()),
            Payload::Json(value) => Ok(value.to_string()),
            other => Err(TransportError::UnexpectedShape {
                path: path.to_string(),
                found: other.shape(),
            }),
        }
    }
}

pub struct HttpTransport {
    base_url: String,
    prefer_stream: bool,
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(base_url: &str, prefer_stream: bool) -> Result<Self, TransportError> {
        let base_url = normalize_base_url(base_url);
        Url::parse(&base_url).map_err(|_| TransportError::InvalidBaseUrl(base_url.clone()))?;

        Ok(Self {
            base_url,
            prefer_stream,
            http: HttpClient::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Payload, TransportError> {
        debug!(%method, path, "backend request");
        let accept = if self.prefer_stream {
            "text/event-stream, application/json;q=0.9, */*;q=0.5"
        } else {
            "application/json, */*;q=0.5"
        };
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(ACCEPT, accept);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| TransportError::network(path, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                path: path.to_string(),
                status,
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        debug!(path, content_type = %content_type, "backend response");

        if content_type.starts_with("text/event-stream") {
            let path = path.to_string();
            let fragments = response
                .bytes_stream()
                .scan(Utf8Carry::default(), move |carry, item| {
                    let fragment = item
                        .map(|bytes| carry.push(&bytes))
                        .map_err(|err| TransportError::network(path.clone(), err));
                    future::ready(Some(fragment))
                })
                .boxed();
            return Ok(Payload::Stream(fragments));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransportError::network(path, err))?;
        if content_type.contains("json") {
            let value =
                serde_json::from_slice(&bytes).map_err(|err| TransportError::body(path, err))?;
            Ok(Payload::Json(value))
        } else {
            Ok(Payload::Text(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }
}

fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

// Holds back a multi-byte character split across two network reads.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_owned();
                self.pending.clear();
                text
            }
            Err(err) if err.error_len().is_none() => {
                let valid = err.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
        }
    }
}
