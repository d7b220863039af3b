//! Topic boards and their quadrants.
//!
//! # Responsibility
//! - Describe the four persisted quadrants bound to each topic.
//! - Describe the two synthetic system quadrants that host unassigned items.
//!
//! # Invariants
//! - `Topic::quadrants` always holds exactly four real quadrants, in grid order.
//! - System quadrants are never persisted as rows.

use crate::model::bookmark::UserId;
use crate::model::item::ItemKind;
use serde::{Deserialize, Serialize};

pub type TopicId = String;
pub type QuadrantId = String;
pub type MemoId = String;

/// Number of real quadrants bound to one topic.
pub const QUADRANTS_PER_TOPIC: usize = 4;

/// Sentinel id of the Inbox system quadrant.
pub const INBOX_QUADRANT_ID: &str = "q-1";
/// Sentinel id of the Memo system quadrant.
pub const MEMO_QUADRANT_ID: &str = "q-2";

/// One board column/cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quadrant {
    pub id: QuadrantId,
    pub title: String,
}

impl Quadrant {
    pub fn new(id: impl Into<QuadrantId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Whether this quadrant is one of the synthetic system buckets.
    pub fn is_system(&self) -> bool {
        SystemQuadrant::from_id(self.id.as_str()).is_some()
    }
}

/// Synthetic buckets for items not assigned to any real quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemQuadrant {
    /// Unassigned bookmarks.
    Inbox,
    /// Unassigned memos.
    Memo,
}

impl SystemQuadrant {
    pub const ALL: [SystemQuadrant; 2] = [SystemQuadrant::Inbox, SystemQuadrant::Memo];

    pub fn id(self) -> &'static str {
        match self {
            Self::Inbox => INBOX_QUADRANT_ID,
            Self::Memo => MEMO_QUADRANT_ID,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::Memo => "Memo",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            INBOX_QUADRANT_ID => Some(Self::Inbox),
            MEMO_QUADRANT_ID => Some(Self::Memo),
            _ => None,
        }
    }

    /// Bucket hosting unassigned items of the given kind.
    pub fn for_kind(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Bookmark => Self::Inbox,
            ItemKind::Memo => Self::Memo,
        }
    }

    pub fn quadrant(self) -> Quadrant {
        Quadrant::new(self.id(), self.title())
    }
}

/// Named board with four fixed-position quadrants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub user_id: UserId,
    pub name: String,
    pub icon: String,
    /// quadrant1..quadrant4 in grid order.
    pub quadrants: [Quadrant; QUADRANTS_PER_TOPIC],
    pub created_at: i64,
    pub updated_at: i64,
}

impl Topic {
    pub fn quadrant_ids(&self) -> Vec<QuadrantId> {
        self.quadrants
            .iter()
            .map(|quadrant| quadrant.id.clone())
            .collect()
    }

    pub fn has_quadrant(&self, quadrant_id: &str) -> bool {
        self.quadrants
            .iter()
            .any(|quadrant| quadrant.id == quadrant_id)
    }
}

/// Free-text note living on one topic board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMemo {
    pub id: MemoId,
    pub topic_id: TopicId,
    pub content: String,
    pub created_at: i64,
}
