//! Bookmark, tag and list records.
//!
//! # Invariants
//! - Tag names are unique per user.
//! - A link bookmark carries exactly one `BookmarkLink` sharing its id.

use serde::{Deserialize, Serialize};

/// Id of the authenticated user owning a record.
pub type UserId = String;
pub type BookmarkId = String;
pub type TagId = String;
pub type ListId = String;

/// Stored bookmark shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkKind {
    Link,
    Text,
    Asset,
}

impl BookmarkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Text => "text",
            Self::Asset => "asset",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "link" => Some(Self::Link),
            "text" => Some(Self::Text),
            "asset" => Some(Self::Asset),
            _ => None,
        }
    }
}

/// Unfurled link metadata stored next to a link bookmark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkLink {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub favicon: Option<String>,
}

/// User-owned label attachable to bookmarks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub user_id: UserId,
    pub name: String,
}

/// Bookmark read model with its link and attached tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub user_id: UserId,
    /// User-editable title; seeded from link metadata on creation.
    pub title: Option<String>,
    pub kind: BookmarkKind,
    pub archived: bool,
    pub favorited: bool,
    pub link: Option<BookmarkLink>,
    /// Attached tags sorted by name.
    pub tags: Vec<Tag>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Bookmark {
    /// Title shown on cards: explicit title, then link title, then url.
    pub fn display_title(&self) -> &str {
        if let Some(title) = self.title.as_deref().filter(|value| !value.trim().is_empty()) {
            return title;
        }
        match self.link.as_ref() {
            Some(link) => link.title.as_deref().unwrap_or(link.url.as_str()),
            None => "",
        }
    }
}

/// Named collection of bookmarks, optionally nested under a parent list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkList {
    pub id: ListId,
    pub user_id: UserId,
    pub name: String,
    pub icon: String,
    pub parent_id: Option<ListId>,
    pub created_at: i64,
    pub updated_at: i64,
}
