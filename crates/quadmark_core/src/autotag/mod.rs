//! Dependency-driven auto-tagging.
//!
//! # Responsibility
//! - Match npm dependency names against keyword rules (`matcher`).
//! - Extract dependency names and repository locations from inputs (`package`).

pub mod matcher;
pub mod package;

pub use matcher::{effective_required_packages, match_rules, passes_required_gate, tag_set_diff, TagSetDiff};
pub use package::{parse_github_url, parse_package_json, GithubLocation, PackageJsonError};
