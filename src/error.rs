//! Stable error taxonomy for store operations.
//!
//! Every operation either succeeds or fails atomically with one of these
//! kinds. None of them are retried internally; `transience()` tells callers
//! whether a retry can ever help.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (the losing side of a version race).
    Retryable,
    /// Unknown if retry will help.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// What we know about side effects when an error is returned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Definitely no side effects occurred.
    None,
    /// Side effects definitely occurred.
    Some,
    /// We don't know if side effects occurred.
    Unknown,
}

/// Transport-level code for an error kind.
///
/// The mapping is stable: clients switch on these, never on messages.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    AlreadyExists,
    Aborted,
    InvalidArgument,
    OutOfRange,
    Canceled,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::Aborted => "ABORTED",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::OutOfRange => "OUT_OF_RANGE",
            ErrorCode::Canceled => "CANCELED",
            ErrorCode::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

/// One field-level validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Path of the offending field, e.g. `.meta.labels[2]`.
    pub field: String,
    pub description: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.description)
    }
}

/// Aggregated validation failure: one violation per offending field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadRequest {
    pub violations: Vec<FieldViolation>,
}

impl std::error::Error for BadRequest {}

impl BadRequest {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    pub fn single(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation::new(field, description)],
        }
    }
}

impl fmt::Display for BadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for violation in &self.violations {
            write!(f, "; {violation}")?;
        }
        Ok(())
    }
}

/// Canonical error for every store operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{type_name} {key}: not found")]
    NotFound { type_name: String, key: String },

    #[error("{type_name} already exists: {key}")]
    AlreadyExists { type_name: String, key: String },

    #[error("{type_name} conflicting resource version: {key}")]
    Conflict { type_name: String, key: String },

    #[error(transparent)]
    BadRequest(#[from] BadRequest),

    #[error("watch expired: {message}")]
    Expired { message: String },

    #[error("operation canceled")]
    Canceled,

    #[error("internal: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn internal(message: impl fmt::Display) -> Self {
        Error::Internal {
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotFound { .. } => ErrorCode::NotFound,
            Error::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Error::Conflict { .. } => ErrorCode::Aborted,
            Error::BadRequest(_) => ErrorCode::InvalidArgument,
            Error::Expired { .. } => ErrorCode::OutOfRange,
            Error::Canceled => ErrorCode::Canceled,
            Error::Internal { .. } => ErrorCode::Internal,
        }
    }

    pub fn transience(&self) -> Transience {
        match self {
            Error::Conflict { .. } => Transience::Retryable,
            Error::NotFound { .. }
            | Error::AlreadyExists { .. }
            | Error::BadRequest(_)
            | Error::Expired { .. } => Transience::Permanent,
            Error::Canceled | Error::Internal { .. } => Transience::Unknown,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Internal { .. } => Effect::Unknown,
            _ => Effect::None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
