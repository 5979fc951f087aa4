//! Watch events emitted for every committed change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCode};

/// Discriminant of a [`ResourceEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Added => "Added",
            EventKind::Modified => "Modified",
            EventKind::Deleted => "Deleted",
            EventKind::Error => "Error",
        };
        f.write_str(s)
    }
}

/// One item of a watch stream.
///
/// `Error` carries a structured status and terminates the stream; the other
/// kinds carry the committed record.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceEvent<T> {
    Added(T),
    Modified(T),
    Deleted(T),
    Error(StreamStatus),
}

impl<T> ResourceEvent<T> {
    pub fn kind(&self) -> EventKind {
        match self {
            ResourceEvent::Added(_) => EventKind::Added,
            ResourceEvent::Modified(_) => EventKind::Modified,
            ResourceEvent::Deleted(_) => EventKind::Deleted,
            ResourceEvent::Error(_) => EventKind::Error,
        }
    }

    pub fn object(&self) -> Option<&T> {
        match self {
            ResourceEvent::Added(obj)
            | ResourceEvent::Modified(obj)
            | ResourceEvent::Deleted(obj) => Some(obj),
            ResourceEvent::Error(_) => None,
        }
    }

    pub fn into_object(self) -> Option<T> {
        match self {
            ResourceEvent::Added(obj)
            | ResourceEvent::Modified(obj)
            | ResourceEvent::Deleted(obj) => Some(obj),
            ResourceEvent::Error(_) => None,
        }
    }
}

/// Structured status carried by an `Error` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub code: ErrorCode,
    pub message: String,
}

impl StreamStatus {
    pub fn from_error(err: &Error) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
