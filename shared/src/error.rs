use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Resource not found")]
    NotFound,
    #[error("Participant already counted")]
    AlreadyParticipated,
    #[error("Resource conflict")]
    Conflict,
    #[error("Internal system error")]
    SystemError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }
}

/// Why a remote write did not land.
#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchFailure {
    #[error("network unavailable")]
    NetworkUnavailable,
    #[error("rejected by the server")]
    RemoteRejected,
    #[error("unknown failure")]
    Unknown,
}

impl DispatchFailure {
    /// Classifies an HTTP status returned by the store.
    pub fn from_status(status: u16) -> Self {
        match status {
            400..=499 => DispatchFailure::RemoteRejected,
            _ => DispatchFailure::Unknown,
        }
    }
}

/// Local rejections raised before or instead of a remote call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("{participant} already counted on {entity}")]
    AlreadyParticipated { entity: String, participant: String },
    #[error("a mutation for {participant} on {entity} is already in flight")]
    DuplicatePending { entity: String, participant: String },
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("unknown sub-item {sub_item} on {entity}")]
    UnknownSubItem { entity: String, sub_item: String },
    #[error("view has been disposed")]
    Disposed,
}

impl From<&ReconcileError> for Error {
    fn from(err: &ReconcileError) -> Self {
        let code = match err {
            ReconcileError::AlreadyParticipated { .. } => ErrorCode::AlreadyParticipated,
            ReconcileError::DuplicatePending { .. } => ErrorCode::Conflict,
            ReconcileError::UnknownEntity(_) | ReconcileError::UnknownSubItem { .. } => ErrorCode::NotFound,
            ReconcileError::Disposed => ErrorCode::SystemError,
        };
        Error::new(code, err.to_string())
    }
}
