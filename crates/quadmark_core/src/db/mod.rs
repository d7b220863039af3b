//! Quadmark storage: one SQLite file holding bookmarks, topic boards and
//! auto-tag rules.
//!
//! # Responsibility
//! - Hand out connections with foreign keys on, a busy timeout set and the
//!   bookmark, topic and auto-tagging tables migrated.
//! - Refuse files written by a newer Quadmark build.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied migration.
//! - No repository sees a connection whose migrations have not all landed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file carries a schema this build cannot read.
    SchemaAhead { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaAhead { found, supported } => write!(
                f,
                "bookmark database is at schema {found}; this build reads up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Sqlite(err) = self {
            return Some(err);
        }
        None
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
