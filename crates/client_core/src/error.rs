use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode {resource} response: {source}")]
    Decode {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid resource link '{href}': {source}")]
    InvalidLink {
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{resource} record has no identity link")]
    MissingIdentity { resource: &'static str },
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Transport { .. } => ErrorCode::Transport,
            Self::Status { .. } => ErrorCode::Status,
            Self::Decode { .. } => ErrorCode::Decode,
            Self::InvalidLink { .. } => ErrorCode::InvalidLink,
            Self::MissingIdentity { .. } => ErrorCode::MissingIdentity,
            Self::Validation { .. } => ErrorCode::Validation,
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<&ClientError> for ApiError {
    fn from(value: &ClientError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}
