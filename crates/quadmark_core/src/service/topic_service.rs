//! Topic board use-case service.
//!
//! # Responsibility
//! - Create topics and memos, rename quadrants.
//! - Assemble a board (registered items, inbox bookmarks, memo items) and
//!   open a `BoardController` session over it.
//! - Persist board arrangements after ownership and payload checks.
//!
//! # Invariants
//! - Saved payloads cover exactly the topic's four quadrants.
//! - Saved items are the user's bookmarks or this topic's memos.
//! - Memberships pointing at deleted items are skipped on load.

use crate::board::controller::BoardController;
use crate::board::store::QuadrantItemStore;
use crate::error::ErrorKind;
use crate::model::bookmark::Bookmark;
use crate::model::item::{Item, ItemContent, ItemKind, QuadrantItems, TagRef};
use crate::model::topic::{Topic, TopicMemo, QUADRANTS_PER_TOPIC};
use crate::repo::bookmark_repo::BookmarkRepository;
use crate::repo::topic_repo::TopicRepository;
use crate::repo::RepoError;
use crate::service::{authenticated_user, non_blank, repo_error_kind};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub enum TopicServiceError {
    Unauthorized,
    /// Name, title or memo content is blank after trim.
    BlankField(&'static str),
    /// Board payload does not describe this topic's quadrants.
    InvalidPayload(String),
    NotFound { entity: &'static str, id: String },
    Repo(RepoError),
}

impl TopicServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::BlankField(_) | Self::InvalidPayload(_) => ErrorKind::ValidationFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Repo(err) => repo_error_kind(err),
        }
    }

    fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for TopicServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::InvalidPayload(details) => write!(f, "invalid board payload: {details}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TopicServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TopicServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Invalid(details) => Self::InvalidPayload(details),
            other => Self::Repo(other),
        }
    }
}

pub type TopicServiceResult<T> = Result<T, TopicServiceError>;

/// Topic plus every item displayed on its board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBoard {
    pub topic: Topic,
    /// Registered items in quadrant then position order, followed by
    /// unassigned bookmarks and unassigned memos.
    pub items: Vec<Item>,
}

/// Topic service facade over topic and bookmark repositories.
pub struct TopicService<T: TopicRepository, B: BookmarkRepository> {
    topics: T,
    bookmarks: B,
}

impl<T: TopicRepository, B: BookmarkRepository> TopicService<T, B> {
    pub fn new(topics: T, bookmarks: B) -> Self {
        Self { topics, bookmarks }
    }

    /// Creates a topic with four default quadrants.
    pub fn create_topic(
        &self,
        user_id: Option<&str>,
        name: &str,
        icon: &str,
    ) -> TopicServiceResult<Topic> {
        let user_id = authenticated_user(user_id).ok_or(TopicServiceError::Unauthorized)?;
        let name = non_blank(name).ok_or(TopicServiceError::BlankField("topic name"))?;
        let topic = self.topics.create_topic(user_id, name, icon.trim())?;
        info!("event=topic_create module=service status=ok");
        Ok(topic)
    }

    pub fn list_topics(&self, user_id: Option<&str>) -> TopicServiceResult<Vec<Topic>> {
        let user_id = authenticated_user(user_id).ok_or(TopicServiceError::Unauthorized)?;
        Ok(self.topics.list_topics(user_id)?)
    }

    pub fn get_topic(&self, user_id: Option<&str>, topic_id: &str) -> TopicServiceResult<Topic> {
        let user_id = authenticated_user(user_id).ok_or(TopicServiceError::Unauthorized)?;
        self.owned_topic(user_id, topic_id)
    }

    pub fn rename_quadrant(
        &self,
        user_id: Option<&str>,
        quadrant_id: &str,
        title: &str,
    ) -> TopicServiceResult<()> {
        let user_id = authenticated_user(user_id).ok_or(TopicServiceError::Unauthorized)?;
        let title = non_blank(title).ok_or(TopicServiceError::BlankField("quadrant title"))?;
        Ok(self.topics.rename_quadrant(user_id, quadrant_id, title)?)
    }

    pub fn add_memo(
        &self,
        user_id: Option<&str>,
        topic_id: &str,
        content: &str,
    ) -> TopicServiceResult<TopicMemo> {
        let user_id = authenticated_user(user_id).ok_or(TopicServiceError::Unauthorized)?;
        let content = non_blank(content).ok_or(TopicServiceError::BlankField("memo content"))?;
        self.owned_topic(user_id, topic_id)?;
        Ok(self.topics.create_memo(topic_id, content)?)
    }

    /// Loads the topic and every item shown on its board.
    pub fn load_board(&self, user_id: Option<&str>, topic_id: &str) -> TopicServiceResult<TopicBoard> {
        let user_id = authenticated_user(user_id).ok_or(TopicServiceError::Unauthorized)?;
        let started_at = Instant::now();
        let topic = self.owned_topic(user_id, topic_id)?;

        let memberships = self.topics.list_memberships(&topic.quadrant_ids())?;
        let bookmarks = self.bookmarks.list_bookmarks(user_id)?;
        let memos = self.topics.list_memos(topic_id)?;
        let bookmarks_by_id: HashMap<&str, &Bookmark> = bookmarks
            .iter()
            .map(|bookmark| (bookmark.id.as_str(), bookmark))
            .collect();
        let memos_by_id: HashMap<&str, &TopicMemo> =
            memos.iter().map(|memo| (memo.id.as_str(), memo)).collect();

        let mut items = Vec::with_capacity(bookmarks.len() + memos.len());
        let mut registered: HashSet<&str> = HashSet::new();
        let mut skipped = 0usize;
        for membership in &memberships {
            let item = match membership.item_type {
                ItemKind::Bookmark => bookmarks_by_id
                    .get(membership.item_id.as_str())
                    .map(|bookmark| bookmark_item(bookmark, membership.quadrant_id.as_str())),
                ItemKind::Memo => memos_by_id
                    .get(membership.item_id.as_str())
                    .map(|memo| memo_item(memo, membership.quadrant_id.as_str())),
            };
            match item {
                Some(item) if registered.insert(membership.item_id.as_str()) => items.push(item),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("event=board_load module=service status=degraded skipped_memberships={skipped}");
        }

        items.extend(
            bookmarks
                .iter()
                .filter(|bookmark| !registered.contains(bookmark.id.as_str()))
                .map(|bookmark| bookmark_item(bookmark, "")),
        );
        items.extend(
            memos
                .iter()
                .filter(|memo| !registered.contains(memo.id.as_str()))
                .map(|memo| memo_item(memo, "")),
        );

        info!(
            "event=board_load module=service status=ok items={} duration_ms={}",
            items.len(),
            started_at.elapsed().as_millis()
        );
        Ok(TopicBoard { topic, items })
    }

    /// Opens a drag session over the current board.
    pub fn open_board(
        &self,
        user_id: Option<&str>,
        topic_id: &str,
    ) -> TopicServiceResult<BoardController> {
        let board = self.load_board(user_id, topic_id)?;
        Ok(BoardController::for_topic(&board.topic, board.items))
    }

    /// Replaces the topic's quadrant memberships with `quadrants`.
    pub fn save_board(
        &self,
        user_id: Option<&str>,
        topic_id: &str,
        quadrants: &[QuadrantItems],
    ) -> TopicServiceResult<()> {
        let user_id = authenticated_user(user_id).ok_or(TopicServiceError::Unauthorized)?;
        let topic = self.owned_topic(user_id, topic_id)?;
        self.save_for_topic(user_id, &topic, quadrants)
    }

    /// Store bound to one owned topic, for `BoardController::drag_end`.
    pub fn board_store(
        &self,
        user_id: Option<&str>,
        topic_id: &str,
    ) -> TopicServiceResult<TopicBoardStore<'_, T, B>> {
        let user_id = authenticated_user(user_id).ok_or(TopicServiceError::Unauthorized)?;
        let topic = self.owned_topic(user_id, topic_id)?;
        Ok(TopicBoardStore {
            service: self,
            user_id: user_id.to_string(),
            topic,
        })
    }

    fn owned_topic(&self, user_id: &str, topic_id: &str) -> TopicServiceResult<Topic> {
        self.topics
            .get_topic(user_id, topic_id)?
            .ok_or_else(|| TopicServiceError::not_found("topic", topic_id))
    }

    fn save_for_topic(
        &self,
        user_id: &str,
        topic: &Topic,
        quadrants: &[QuadrantItems],
    ) -> TopicServiceResult<()> {
        if quadrants.len() != QUADRANTS_PER_TOPIC {
            return Err(TopicServiceError::InvalidPayload(format!(
                "expected {QUADRANTS_PER_TOPIC} quadrants, got {}",
                quadrants.len()
            )));
        }
        let mut covered = HashSet::new();
        for quadrant in quadrants {
            if !topic.has_quadrant(quadrant.quadrant_id.as_str()) {
                return Err(TopicServiceError::not_found(
                    "quadrant",
                    quadrant.quadrant_id.as_str(),
                ));
            }
            covered.insert(quadrant.quadrant_id.as_str());
        }
        if covered.len() != QUADRANTS_PER_TOPIC {
            return Err(TopicServiceError::InvalidPayload(
                "every topic quadrant must appear exactly once".to_string(),
            ));
        }

        let memo_ids: HashSet<String> = self
            .topics
            .list_memos(topic.id.as_str())?
            .into_iter()
            .map(|memo| memo.id)
            .collect();
        for item in quadrants.iter().flat_map(|quadrant| quadrant.items.iter()) {
            let known = match item.item_type {
                ItemKind::Bookmark => self
                    .bookmarks
                    .get_bookmark(user_id, item.item_id.as_str())?
                    .is_some(),
                ItemKind::Memo => memo_ids.contains(&item.item_id),
            };
            if !known {
                return Err(TopicServiceError::not_found(
                    item.item_type.as_str(),
                    item.item_id.as_str(),
                ));
            }
        }

        Ok(self.topics.save_quadrant_items(quadrants)?)
    }
}

/// `QuadrantItemStore` scoped to one user's topic.
pub struct TopicBoardStore<'svc, T: TopicRepository, B: BookmarkRepository> {
    service: &'svc TopicService<T, B>,
    user_id: String,
    topic: Topic,
}

impl<T: TopicRepository, B: BookmarkRepository> TopicBoardStore<'_, T, B> {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl<T: TopicRepository, B: BookmarkRepository> QuadrantItemStore for TopicBoardStore<'_, T, B> {
    type Error = TopicServiceError;

    fn save_quadrant_items(&self, quadrants: &[QuadrantItems]) -> Result<(), Self::Error> {
        self.service
            .save_for_topic(self.user_id.as_str(), &self.topic, quadrants)
    }
}

fn bookmark_item(bookmark: &Bookmark, quadrant_id: &str) -> Item {
    let link = bookmark.link.as_ref();
    Item {
        id: bookmark.id.clone(),
        quadrant_id: quadrant_id.to_string(),
        content: ItemContent::Bookmark {
            title: bookmark.display_title().to_string(),
            description: link
                .and_then(|link| link.description.clone())
                .unwrap_or_default(),
            image_url: link
                .and_then(|link| link.image_url.clone())
                .unwrap_or_default(),
            tags: bookmark
                .tags
                .iter()
                .map(|tag| TagRef {
                    id: tag.id.clone(),
                    name: tag.name.clone(),
                })
                .collect(),
        },
    }
}

fn memo_item(memo: &TopicMemo, quadrant_id: &str) -> Item {
    Item::memo(memo.id.clone(), quadrant_id, memo.content.clone())
}
