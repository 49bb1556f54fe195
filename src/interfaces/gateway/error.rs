use thiserror::Error;

use crate::application::ports::ObserverClosed;
use crate::shared::DomainError;

/// Reasons a gateway session ends abnormally
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The inbound side reported an error instead of completing
    #[error("Client aborted the stream: {0}")]
    ClientAborted(String),

    /// The peer stopped accepting responses
    #[error(transparent)]
    Closed(#[from] ObserverClosed),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::ClientAborted(_) => "CLIENT_ABORTED",
            Self::Closed(_) => "CANCELLED",
        }
    }
}
