//! Board items: bookmarks and memos placed on a topic board.
//!
//! # Invariants
//! - `Item::id` is the underlying bookmark or memo id.
//! - An empty `quadrant_id` means unassigned; the board routes such items to
//!   the system quadrant matching their kind.

use crate::model::bookmark::TagId;
use crate::model::topic::QuadrantId;
use serde::{Deserialize, Serialize};

pub type ItemId = String;

/// Discriminator stored in `topic_quadrant_items.item_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Bookmark,
    Memo,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bookmark => "bookmark",
            Self::Memo => "memo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bookmark" => Some(Self::Bookmark),
            "memo" => Some(Self::Memo),
            _ => None,
        }
    }
}

/// Tag summary rendered on bookmark cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: TagId,
    pub name: String,
}

/// Card content, one variant per item kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemContent {
    Bookmark {
        title: String,
        description: String,
        image_url: String,
        tags: Vec<TagRef>,
    },
    Memo {
        content: String,
    },
}

/// One draggable card on a topic board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Real quadrant id, or any other value (usually empty) when unassigned.
    pub quadrant_id: QuadrantId,
    pub content: ItemContent,
}

impl Item {
    pub fn bookmark(
        id: impl Into<ItemId>,
        quadrant_id: impl Into<QuadrantId>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            quadrant_id: quadrant_id.into(),
            content: ItemContent::Bookmark {
                title: title.into(),
                description: String::new(),
                image_url: String::new(),
                tags: Vec::new(),
            },
        }
    }

    pub fn memo(
        id: impl Into<ItemId>,
        quadrant_id: impl Into<QuadrantId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            quadrant_id: quadrant_id.into(),
            content: ItemContent::Memo {
                content: content.into(),
            },
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self.content {
            ItemContent::Bookmark { .. } => ItemKind::Bookmark,
            ItemContent::Memo { .. } => ItemKind::Memo,
        }
    }

    /// Short label used in drag announcements.
    pub fn label(&self) -> &str {
        match &self.content {
            ItemContent::Bookmark { title, .. } => title.as_str(),
            ItemContent::Memo { content } => content.lines().next().unwrap_or_default(),
        }
    }

    /// Case-insensitive keyword match over the visible card text.
    ///
    /// A blank keyword matches everything.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        match &self.content {
            ItemContent::Bookmark {
                title,
                description,
                tags,
                ..
            } => {
                title.to_lowercase().contains(&needle)
                    || description.to_lowercase().contains(&needle)
                    || tags
                        .iter()
                        .any(|tag| tag.name.to_lowercase().contains(&needle))
            }
            ItemContent::Memo { content } => content.to_lowercase().contains(&needle),
        }
    }

    pub fn to_ref(&self) -> ItemRef {
        ItemRef {
            item_id: self.id.clone(),
            item_type: self.kind(),
        }
    }
}

/// Persisted reference to one item inside a quadrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub item_id: ItemId,
    pub item_type: ItemKind,
}

/// Full ordered content of one real quadrant, as handed to persistence.
///
/// List index is the stored `position`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantItems {
    pub quadrant_id: QuadrantId,
    pub items: Vec<ItemRef>,
}

/// One stored `(quadrant, item)` membership row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantMembership {
    pub quadrant_id: QuadrantId,
    pub item_id: ItemId,
    pub item_type: ItemKind,
    pub position: i64,
}
