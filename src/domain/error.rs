use std::time::Duration;
use thiserror::Error;

/// Failures of the radio link and the coordinate protocol.
///
/// Only [`SyncError::TransportUnavailable`] is fatal; every other variant is
/// absorbed by the session and turned into a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("radio unavailable: {0}")]
    TransportUnavailable(String),

    #[error("no matching peer discovered after {0:?}")]
    DiscoveryTimeout(Duration),

    #[error("failed to connect to {0}")]
    ConnectFailed(String),

    #[error("service {0} not found on peer")]
    ServiceNotFound(String),

    #[error("attribute {0} not found")]
    AttributeNotFound(String),

    #[error("attribute {0} does not permit this operation")]
    NotPermitted(String),

    #[error("payload {0:?} is not a decimal integer")]
    DecodeFailure(String),

    #[error("link to peer lost")]
    LinkLost,

    #[error("no active link")]
    NotConnected,
}

impl SyncError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportUnavailable(_))
    }
}
