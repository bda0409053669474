// Error types shared by the API clients, the agent runtime and the HTTP layer
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures talking to an upstream generative API
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to decode base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("{0}")]
    MissingData(String),
}

impl ClientError {
    /// Short variant name, reported to callers as `error_type`
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Http(e) if e.is_timeout() => "Timeout",
            ClientError::Http(_) => "HttpError",
            ClientError::Api { .. } => "ApiError",
            ClientError::Decode(_) => "DecodeError",
            ClientError::Base64(_) => "DecodeError",
            ClientError::MissingData(_) => "MissingData",
        }
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Model call failed: {0}")]
    Model(#[from] ClientError),
    #[error("Tool '{name}' failed: {message}")]
    Tool { name: String, message: String },
    #[error("Agent '{agent}' exceeded {limit} model turns without a final answer")]
    IterationLimit { agent: String, limit: usize },
    #[error("Session error: {0}")]
    Session(String),
}

impl AgentError {
    pub fn tool(name: &str, message: impl Into<String>) -> Self {
        AgentError::Tool {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// Errors surfaced by HTTP handlers. Every variant renders as `{"detail": ...}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} environment variable is required")]
    MissingCredential(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "rejected request");
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
