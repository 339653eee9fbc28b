//! Error taxonomy shared by every fallible Axon operation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status code returned by fallible operations in return-code mode
pub const SUCCESS: i32 = 0;

/// What went wrong, independent of how it is signaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Hub URL already present in the registry
    DuplicateHub,
    /// Hub did not answer the registration probe
    UnreachableHub,
    /// No hub registered at all
    NoHubRegistered,
    /// No registered hub reports a matching identifier
    UnknownFunction,
    /// Function resolved but not currently reachable
    Offline,
    /// Hub request timed out
    Timeout,
    /// Hub answered with data the client cannot parse
    MalformedResponse,
    /// Hub refused an attribute write
    WriteRejected,
    /// Caller-supplied argument is invalid
    InvalidArgument,
}

impl ErrorKind {
    /// Negative status code used by return-code mode
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::DuplicateHub => -1,
            ErrorKind::UnreachableHub => -2,
            ErrorKind::NoHubRegistered => -3,
            ErrorKind::UnknownFunction => -4,
            ErrorKind::Offline => -5,
            ErrorKind::Timeout => -6,
            ErrorKind::MalformedResponse => -7,
            ErrorKind::WriteRejected => -8,
            ErrorKind::InvalidArgument => -9,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::DuplicateHub => "duplicate hub",
            ErrorKind::UnreachableHub => "unreachable hub",
            ErrorKind::NoHubRegistered => "no hub registered",
            ErrorKind::UnknownFunction => "unknown function",
            ErrorKind::Offline => "offline",
            ErrorKind::Timeout => "timeout",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::WriteRejected => "write rejected",
            ErrorKind::InvalidArgument => "invalid argument",
        };
        write!(f, "{}", name)
    }
}

/// Structured error carrying the kind and a human-readable message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct AxonError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AxonError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Negative status code for this error's kind
    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}
