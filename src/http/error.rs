//! Transport errors raised by the vendor HTTP session.

use reqwest::StatusCode;
use serde_json::{Map, Value};

/// A failed request against a remote API.
#[derive(Debug)]
pub enum RequestError {
    /// The server answered with a non-2xx status.
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },
    /// The request never produced a response (connection, TLS, client timeout).
    Transport(reqwest::Error),
    /// A 2xx response whose body did not have the expected shape.
    InvalidResponse(String),
}

impl RequestError {
    pub fn from_status(status: StatusCode, url: impl Into<String>, body: impl Into<String>) -> Self {
        RequestError::Status {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Transport(e) => e.status(),
            RequestError::InvalidResponse(_) => None,
        }
    }

    pub fn is_gateway_timeout(&self) -> bool {
        self.status() == Some(StatusCode::GATEWAY_TIMEOUT)
    }

    /// Best-effort JSON decode of the error response body.
    ///
    /// Returns an empty mapping when there is no response, the body is not
    /// valid JSON, or the JSON is not an object. Never fails.
    pub fn response_json(&self) -> Map<String, Value> {
        match self {
            RequestError::Status { body, .. } => match serde_json::from_str::<Value>(body) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            _ => Map::new(),
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Status { status, url, .. } => {
                let kind = if status.is_client_error() {
                    "Client Error"
                } else {
                    "Server Error"
                };
                write!(
                    f,
                    "{} {}: {} for url: {}",
                    status.as_u16(),
                    kind,
                    status.canonical_reason().unwrap_or("Unknown"),
                    url
                )
            }
            RequestError::Transport(e) => write!(f, "Request failed: {}", e),
            RequestError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(error: reqwest::Error) -> Self {
        RequestError::Transport(error)
    }
}
