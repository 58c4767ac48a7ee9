use thiserror::Error;

use crate::entities::SourceId;

/// Per-finding failure raised by the evidence normaliser.
/// Always non-fatal: the finding is logged and dropped, the run continues.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NormalizationError {
    #[error("Unknown evidence category hint: {0:?}")]
    UnknownCategory(String),

    #[error("Malformed {category} payload: {reason}")]
    MalformedPayload { category: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// Invalid top_k, weight table or scoring option. Aborts the run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Source {source_id} unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocked request: {0}")]
    Security(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DiscoveryError {
    pub fn config(msg: impl Into<String>) -> Self {
        DiscoveryError::Configuration(msg.into())
    }

    pub fn unavailable(source_id: SourceId, reason: impl ToString) -> Self {
        DiscoveryError::SourceUnavailable { source_id, reason: reason.to_string() }
    }

    /// Configuration errors invalidate every score of the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DiscoveryError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
