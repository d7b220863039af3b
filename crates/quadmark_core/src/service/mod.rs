//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce authentication, input validation and ownership before writes.
//! - Keep UI/FFI layers decoupled from storage details.
//!
//! # Invariants
//! - A missing or blank user id fails closed with `Unauthorized`.
//! - Every service error maps onto one `ErrorKind`.

pub mod auto_tag_service;
pub mod bookmark_service;
pub mod external;
pub mod list_service;
pub mod topic_service;

use crate::error::ErrorKind;
use crate::repo::RepoError;

/// Trimmed caller id, or `None` when absent or blank.
pub(crate) fn authenticated_user(user_id: Option<&str>) -> Option<&str> {
    user_id.map(str::trim).filter(|value| !value.is_empty())
}

/// Trimmed input, or `None` when blank.
pub(crate) fn non_blank(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

pub(crate) fn repo_error_kind(err: &RepoError) -> ErrorKind {
    match err {
        RepoError::NotFound { .. } => ErrorKind::NotFound,
        RepoError::Duplicate { .. } | RepoError::Invalid(_) => ErrorKind::ValidationFailed,
        _ => ErrorKind::PersistenceFailure,
    }
}
