//! Caller-facing error classification shared by every use-case error.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Coarse error category surfaced to UI callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No authenticated user.
    Unauthorized,
    /// Target record absent or owned by someone else.
    NotFound,
    /// Input rejected before any write.
    ValidationFailed,
    /// Storage or collaborator failure.
    PersistenceFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::ValidationFailed => "validation_failed",
            Self::PersistenceFailure => "persistence_failure",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
