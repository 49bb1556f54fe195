use thiserror::Error;

/// Transport-neutral classification of a [`DomainError`].
///
/// Every adapter maps a kind onto exactly one of its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    InvalidArgument,
    PayloadTooLarge,
    Internal,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Stream already exists with name: {0}")]
    StreamAlreadyExists(String),

    #[error("Invalid stream state: {0}")]
    InvalidState(String),

    #[error("Invalid stream operation: {0}")]
    InvalidOperation(String),

    #[error("Payload size {size} exceeds maximum of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StreamNotFound(_) => ErrorKind::NotFound,
            Self::StreamAlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidState(_) | Self::InvalidOperation(_) => ErrorKind::FailedPrecondition,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::Validation(_) => ErrorKind::InvalidArgument,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code carried in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StreamNotFound(_) => "STREAM_NOT_FOUND",
            Self::StreamAlreadyExists(_) => "STREAM_ALREADY_EXISTS",
            Self::InvalidState(_) => "INVALID_STREAM_STATE",
            Self::InvalidOperation(_) => "INVALID_STREAM_OPERATION",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Validation(_) => "INVALID_ARGUMENT",
            Self::Storage(_) => "INTERNAL",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
