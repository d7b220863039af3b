//! Core domain logic for Quadmark.
//! This crate is the single source of truth for business invariants.

pub mod autotag;
pub mod board;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use error::ErrorKind;
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::item::{Item, ItemContent, ItemKind, ItemRef, QuadrantItems};
pub use model::topic::{Quadrant, SystemQuadrant, Topic};
pub use repo::{RepoError, RepoResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
