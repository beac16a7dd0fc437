// src/errors.rs
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Request to {endpoint} timed out after {after:?}")]
    Timeout { endpoint: String, after: Duration },

    #[error("Result stream broke off: {0}")]
    StreamRead(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Challenge '{0}' not found")]
    ChallengeNotFound(String),

    #[error("Session '{0}' already has a request in flight")]
    SessionBusy(&'static str),
}

impl ClientError {
    /// Failures the sessions turn into their generic "could not connect" text.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Request(_)
                | ClientError::Timeout { .. }
                | ClientError::StreamRead(_)
                | ClientError::JsonParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
