//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `quadmark_core` linkage.
//! - Confirm schema bootstrap against an in-memory database.
//! - Keep output deterministic for quick local sanity checks.

use quadmark_core::db::migrations::{current_user_version, latest_version};
use quadmark_core::db::open_db_in_memory;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("quadmark_core ping={}", quadmark_core::ping());
    println!("quadmark_core version={}", quadmark_core::core_version());

    let schema = open_db_in_memory().and_then(|conn| current_user_version(&conn));
    match schema {
        Ok(version) => {
            println!("quadmark_core schema={version}/{}", latest_version());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("quadmark_core schema bootstrap failed: {err}");
            ExitCode::FAILURE
        }
    }
}
