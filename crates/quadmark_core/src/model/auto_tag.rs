//! Auto-tagging rules and Node.js project records.
//!
//! # Invariants
//! - A rule maps one tag to a set of npm dependency-name keywords.
//! - Required packages gate which repositories count as Node.js projects.

use crate::model::bookmark::{BookmarkId, Tag, TagId, UserId};
use serde::{Deserialize, Serialize};

/// Packages used when a user has not configured any required package.
pub const DEFAULT_REQUIRED_PACKAGES: &[&str] = &["next"];

/// Matcher input: one tag and the keywords that fire it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTagRule {
    pub tag_id: TagId,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTagKeyword {
    pub id: String,
    pub auto_tag_id: String,
    pub keyword: String,
}

/// Stored auto-tag configuration for one user tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTag {
    pub id: String,
    pub user_id: UserId,
    pub tag: Tag,
    pub keywords: Vec<AutoTagKeyword>,
}

impl AutoTag {
    pub fn to_rule(&self) -> AutoTagRule {
        AutoTagRule {
            tag_id: self.tag.id.clone(),
            keywords: self
                .keywords
                .iter()
                .map(|keyword| keyword.keyword.clone())
                .collect(),
        }
    }
}

/// One entry of a user's required-package allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPackage {
    pub id: String,
    pub user_id: UserId,
    pub package_name: String,
}

/// GitHub repository metadata captured at import time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRepo {
    /// GitHub's numeric repository id.
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub stargazers_count: i64,
    /// Epoch ms of the last push, when known.
    pub pushed_at: Option<i64>,
}

/// Imported Node.js project (one package.json inside a repository).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodejsProject {
    pub id: String,
    pub repo_id: i64,
    /// Directory of the package.json inside the repository; empty for root.
    pub path: String,
    pub html_url: String,
    pub bookmark_id: Option<BookmarkId>,
    /// Sorted dependency names.
    pub packages: Vec<String>,
}
