use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the backend: network, status, or body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {path} failed: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} returned {status}: {body}")]
    Status {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("could not parse response from {path}: {source}")]
    Body {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid base url {0:?}")]
    InvalidBaseUrl(String),
    #[error("unexpected {found} response from {path}")]
    UnexpectedShape { path: String, found: &'static str },
}

impl TransportError {
    pub fn network(path: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            path: path.into(),
            source,
        }
    }

    pub fn body(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Body {
            path: path.into(),
            source,
        }
    }
}

/// A single stream frame that could not be decoded. Never fatal.
#[derive(Debug, Error)]
#[error("malformed stream frame {frame:?}: {source}")]
pub struct DecodeError {
    pub frame: String,
    #[source]
    pub source: serde_json::Error,
}

/// User-facing rejection raised before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("error description is empty")]
    EmptyErrorDescription,
    #[error("No model response to fix.")]
    NoModelTurnToFix,
    #[error("goal is empty")]
    EmptyGoal,
    #[error("Agent is already running.")]
    AgentAlreadyRunning,
    #[error("no model selected")]
    NoModel,
    #[error("a request is already in flight")]
    RequestInFlight,
    #[error("invalid confirmation {0:?}; expected approve or deny")]
    InvalidConfirmation(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type ClientResult<T> = Result<T, ClientError>;
