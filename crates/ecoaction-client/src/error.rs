use reqwest::StatusCode;
use thiserror::Error;

use crate::board::MutationError;

/// Why an image was refused before it left the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejected {
    #[error("No file provided")]
    Empty,
    #[error("File too large. Maximum size is 5MB")]
    TooLarge { size: u64 },
    #[error("Invalid file type. Allowed: PNG, JPG, JPEG, GIF, WEBP")]
    UnsupportedType { content_type: String },
    #[error("Invalid filename")]
    InvalidFilename,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Authentication required")]
    Unauthenticated,

    /// Non-2xx status or a body with `success: false`.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Upload(#[from] UploadRejected),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error("session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Api { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
