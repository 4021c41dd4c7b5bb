//! Error taxonomy shared by the gateway, the controllers and the credential store.

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Validation(String),
    #[error("a request is already in flight")]
    InFlight,
    #[error("no API key configured")]
    MissingCredential,
    #[error("{}", transport_message(.status, .message))]
    Transport {
        status: Option<u16>,
        code: Option<ErrorCode>,
        message: String,
    },
    #[error("malformed response body: {0}")]
    Decode(String),
    /// Soft error reported inside an otherwise successful response.
    #[error("{0}")]
    Application(String),
    #[error("credential storage failure: {0}")]
    Storage(String),
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("request failed ({status}): {message}"),
        None => format!("request failed: {message}"),
    }
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn from_api_error(status: u16, err: ApiError) -> Self {
        Self::Transport {
            status: Some(status),
            code: Some(err.code),
            message: err.message,
        }
    }

    /// Status code of a failed HTTP exchange, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential
                | Self::Transport {
                    code: Some(ErrorCode::Unauthorized | ErrorCode::Forbidden),
                    ..
                }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Decode(value.to_string());
        }
        match value.status() {
            Some(status) => Self::Transport {
                status: Some(status.as_u16()),
                code: Some(ErrorCode::from_status(status.as_u16())),
                message: value.to_string(),
            },
            None if value.is_timeout() => Self::connection(format!("request timed out: {value}")),
            None => Self::connection(value.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}
