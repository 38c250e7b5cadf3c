use thiserror::Error;

/// Why a result could not be delivered.
///
/// `forwarder_core::send` folds every variant into `false`; use
/// `forwarder_core::try_send` when the cause matters.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Invalid endpoint configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to serialize result payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("No response from collector: {0}")]
    Transport(#[from] ureq::Error),
    #[error("Collector responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to spawn delivery worker: {0}")]
    Worker(String),
}

impl ForwardError {
    /// The HTTP status of the collector's reply, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
