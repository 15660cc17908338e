//! Error types for the CMS synchronization layer

use crate::dispatch::Action;
use crate::model::EntityKind;

/// Failure reported by the remote store or the transport in front of it.
///
/// The message is kept verbatim so callers can show exactly what the
/// backend said.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GatewayError {
    pub status: Option<u16>,
    pub message: String,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Whether the store rejected the request because of a row-level
    /// security or bucket policy.
    pub fn is_policy_violation(&self) -> bool {
        let msg = self.message.to_lowercase();
        msg.contains("row-level security") || msg.contains("policy")
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Why an upload to object storage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFailure {
    /// Bucket missing, private, or guarded by a policy the client does not satisfy.
    Policy,
    /// Any other transport or storage failure.
    Transport,
}

/// Error type for every core operation.
#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("upload to '{bucket}' failed: {message}")]
    Upload {
        kind: UploadFailure,
        bucket: String,
        message: String,
    },

    #[error("write failed: {0}")]
    Write(GatewayError),

    #[error("fetch failed: {0}")]
    Fetch(GatewayError),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("no handler registered for {action} on {kind}")]
    UnknownCommand { kind: EntityKind, action: Action },

    #[error("not authenticated")]
    Unauthenticated,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CmsError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CmsError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Classify a storage failure for the given bucket.
    pub fn upload(bucket: &str, err: GatewayError) -> Self {
        let kind = if err.is_policy_violation() {
            UploadFailure::Policy
        } else {
            UploadFailure::Transport
        };
        CmsError::Upload {
            kind,
            bucket: bucket.to_string(),
            message: err.message,
        }
    }

    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            CmsError::Upload {
                kind: UploadFailure::Policy,
                ..
            }
        )
    }

    /// Text shown to staff when this error ends an operation.
    pub fn user_message(&self) -> String {
        match self {
            CmsError::Validation { message, .. } => message.clone(),
            CmsError::Upload {
                kind: UploadFailure::Policy,
                bucket,
                ..
            } => format!(
                "Storage bucket permissions not configured. Create the '{}' bucket and make it public or add storage policies.",
                bucket
            ),
            CmsError::Upload {
                bucket, message, ..
            } => format!(
                "Error uploading image: {}. Please ensure the '{}' bucket exists and is public.",
                message, bucket
            ),
            CmsError::Write(e) => format!("Error saving changes: {}", e),
            CmsError::Fetch(e) => format!("Error loading data: {}", e),
            CmsError::NotFound { kind, .. } => format!("{} not found!", kind.label()),
            CmsError::UnknownCommand { .. } => format!("Unexpected error: {}", self),
            CmsError::Unauthenticated => "Please login again.".to_string(),
            CmsError::Config(msg) => format!("Configuration error: {}", msg),
            CmsError::Other(e) => format!("Unexpected error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, CmsError>;
