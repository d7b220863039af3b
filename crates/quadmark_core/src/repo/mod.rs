//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories are constructed only on fully migrated connections.
//! - Multi-row writes run inside one `IMMEDIATE` transaction.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`) in
//!   addition to DB transport errors.

pub mod auto_tag_repo;
pub mod bookmark_repo;
pub mod error;
pub mod list_repo;
mod schema_check;
pub mod topic_repo;

pub use error::{RepoError, RepoResult};
