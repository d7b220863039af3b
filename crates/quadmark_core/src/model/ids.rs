//! Prefixed entity identifiers.
//!
//! Ids look like `bm_6f1c...`: a short entity prefix plus a v4 UUID in simple
//! form. The prefix is informational only; lookups never parse it.

use uuid::Uuid;

pub const BOOKMARK_PREFIX: &str = "bm";
pub const TAG_PREFIX: &str = "bmt";
pub const LIST_PREFIX: &str = "bml";
pub const TOPIC_PREFIX: &str = "tpc";
pub const QUADRANT_PREFIX: &str = "qd";
pub const MEMO_PREFIX: &str = "memo";
pub const AUTO_TAG_PREFIX: &str = "at";
pub const AUTO_TAG_KEYWORD_PREFIX: &str = "atk";
pub const REQUIRED_PACKAGE_PREFIX: &str = "njr";
pub const NODEJS_PROJECT_PREFIX: &str = "njp";
pub const BOARD_SESSION_PREFIX: &str = "brd";

/// Generates a fresh id with the given entity prefix.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::{generate_id, BOOKMARK_PREFIX};

    #[test]
    fn generated_ids_carry_prefix_and_are_unique() {
        let first = generate_id(BOOKMARK_PREFIX);
        let second = generate_id(BOOKMARK_PREFIX);
        assert!(first.starts_with("bm_"));
        assert_eq!(first.len(), "bm_".len() + 32);
        assert_ne!(first, second);
    }
}
