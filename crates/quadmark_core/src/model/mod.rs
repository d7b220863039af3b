//! Domain model for bookmarks, topic boards and auto-tagging.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep the bookmark/memo board item a closed sum type.
//!
//! # Invariants
//! - Every persisted entity is identified by a prefixed opaque string id.
//! - A topic owns exactly four real quadrants.

pub mod auto_tag;
pub mod bookmark;
pub mod ids;
pub mod item;
pub mod topic;
