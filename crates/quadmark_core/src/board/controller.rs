//! Board session state machine.
//!
//! # Responsibility
//! - Own one session's quadrants, committed items and speculative preview.
//! - Turn drag gestures into reconciled arrangements and persist them on drop.
//! - Produce assistive-technology announcements for each transition.
//!
//! # Invariants
//! - At most one drag is active; a second `drag_start` is rejected.
//! - Drag-over never persists and is a pure function of the committed
//!   arrangement and the current target.
//! - Drag-cancel restores the committed arrangement.
//! - Quadrant display order is session-local and never persisted.

use crate::board::reconcile::{
    array_move, items_in_quadrant, position_in_quadrant, quadrant_items_for_save,
    reconcile_item_over_item, reconcile_item_over_quadrant,
};
use crate::board::store::QuadrantItemStore;
use crate::error::ErrorKind;
use crate::model::item::{Item, ItemId, QuadrantItems};
use crate::model::topic::{Quadrant, QuadrantId, SystemQuadrant, Topic};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Draggable thing on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEntity {
    Quadrant(QuadrantId),
    Item(ItemId),
}

impl BoardEntity {
    fn kind_label(&self) -> &'static str {
        match self {
            Self::Quadrant(_) => "quadrant",
            Self::Item(_) => "item",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging {
        active: BoardEntity,
        /// Display quadrant of a picked-up item; used for announcements only.
        origin_quadrant: Option<QuadrantId>,
    },
}

/// Outcome of a completed drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    pub announcement: Option<String>,
    /// Payload handed to the store, when the arrangement changed.
    pub saved: Option<Vec<QuadrantItems>>,
}

#[derive(Debug)]
pub enum BoardError {
    DragInProgress,
    NoActiveDrag,
    UnknownEntity(String),
    /// The store rejected the new arrangement. Local state keeps it anyway.
    Persistence(Box<dyn Error>),
}

impl BoardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DragInProgress | Self::NoActiveDrag => ErrorKind::ValidationFailed,
            Self::UnknownEntity(_) => ErrorKind::NotFound,
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DragInProgress => write!(f, "a drag is already in progress"),
            Self::NoActiveDrag => write!(f, "no drag in progress"),
            Self::UnknownEntity(id) => write!(f, "unknown board entity: {id}"),
            Self::Persistence(err) => write!(f, "failed to save board: {err}"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// One board session.
#[derive(Debug, Clone)]
pub struct BoardController {
    /// Display order: real quadrants then system quadrants, reorderable.
    quadrants: Vec<Quadrant>,
    /// Persisted quadrants in topic order.
    real_quadrant_ids: Vec<QuadrantId>,
    committed: Vec<Item>,
    items: Vec<Item>,
    drag: DragState,
    filter: String,
}

impl BoardController {
    pub fn new(real_quadrants: Vec<Quadrant>, items: Vec<Item>) -> Self {
        let real_quadrant_ids = real_quadrants
            .iter()
            .map(|quadrant| quadrant.id.clone())
            .collect();
        let mut quadrants = real_quadrants;
        quadrants.extend(SystemQuadrant::ALL.iter().map(|system| system.quadrant()));
        Self {
            quadrants,
            real_quadrant_ids,
            committed: items.clone(),
            items,
            drag: DragState::Idle,
            filter: String::new(),
        }
    }

    pub fn for_topic(topic: &Topic, items: Vec<Item>) -> Self {
        Self::new(topic.quadrants.to_vec(), items)
    }

    /// Quadrants in current display order.
    pub fn quadrants(&self) -> &[Quadrant] {
        &self.quadrants
    }

    pub fn real_quadrant_ids(&self) -> &[QuadrantId] {
        &self.real_quadrant_ids
    }

    /// Current arrangement, including any drag preview.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Last arrangement accepted by a drop.
    pub fn committed_items(&self) -> &[Item] {
        &self.committed
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, keyword: &str) {
        self.filter = keyword.trim().to_string();
    }

    /// Items shown in one quadrant after the keyword filter.
    pub fn visible_items(&self, quadrant_id: &str) -> Vec<&Item> {
        items_in_quadrant(&self.items, quadrant_id, &self.real_quadrant_ids)
            .into_iter()
            .filter(|item| item.matches_keyword(&self.filter))
            .collect()
    }

    /// Appends an item (e.g. a freshly created memo) to both arrangements.
    pub fn insert_item(&mut self, item: Item) {
        self.committed.push(item.clone());
        self.items.push(item);
    }

    pub fn drag_start(&mut self, active: BoardEntity) -> Result<Option<String>, BoardError> {
        if self.is_dragging() {
            return Err(BoardError::DragInProgress);
        }

        let (announcement, origin_quadrant) = match &active {
            BoardEntity::Quadrant(id) => {
                let index = self
                    .quadrant_index(id)
                    .ok_or_else(|| BoardError::UnknownEntity(id.clone()))?;
                let message = format!(
                    "Picked up quadrant {} at position {} of {}",
                    self.quadrants[index].title,
                    index + 1,
                    self.quadrants.len()
                );
                (message, None)
            }
            BoardEntity::Item(id) => {
                let (quadrant_id, position, count) =
                    position_in_quadrant(&self.items, id, &self.real_quadrant_ids)
                        .ok_or_else(|| BoardError::UnknownEntity(id.clone()))?;
                let message = format!(
                    "Picked up item {} at position {position} of {count} in quadrant {}",
                    self.item_label(id),
                    self.quadrant_title(quadrant_id)
                );
                (message, Some(quadrant_id.to_string()))
            }
        };

        debug!(
            "event=board_drag_start module=board status=ok entity={}",
            active.kind_label()
        );
        self.drag = DragState::Dragging {
            active,
            origin_quadrant,
        };
        Ok(Some(announcement))
    }

    /// Recomputes the preview for the current target. `None` clears it.
    pub fn drag_over(&mut self, over: Option<BoardEntity>) -> Result<Option<String>, BoardError> {
        let DragState::Dragging {
            active,
            origin_quadrant,
        } = &self.drag
        else {
            return Err(BoardError::NoActiveDrag);
        };
        let active = active.clone();
        let origin_quadrant = origin_quadrant.clone();

        match (&active, over.as_ref()) {
            (BoardEntity::Item(active_id), Some(target)) => {
                self.items = self.arrange(active_id, target);
                Ok(self.item_announcement(active_id, origin_quadrant.as_deref(), false))
            }
            (BoardEntity::Item(_), None) => {
                self.items = self.committed.clone();
                Ok(None)
            }
            (BoardEntity::Quadrant(active_id), Some(BoardEntity::Quadrant(over_id)))
                if active_id != over_id =>
            {
                Ok(self.quadrant_index(over_id).map(|index| {
                    format!(
                        "Quadrant {} was moved over {} at position {} of {}",
                        self.quadrant_title(active_id),
                        self.quadrants[index].title,
                        index + 1,
                        self.quadrants.len()
                    )
                }))
            }
            (BoardEntity::Quadrant(_), _) => Ok(None),
        }
    }

    /// Completes the drag. Changed item arrangements are committed locally
    /// first, then handed to `store`.
    ///
    /// # Errors
    /// - `NoActiveDrag` when idle.
    /// - `Persistence` when the store fails; the new arrangement stays in place.
    pub fn drag_end<S: QuadrantItemStore>(
        &mut self,
        over: Option<BoardEntity>,
        store: &S,
    ) -> Result<DragEnd, BoardError> {
        let DragState::Dragging {
            active,
            origin_quadrant,
        } = std::mem::replace(&mut self.drag, DragState::Idle)
        else {
            return Err(BoardError::NoActiveDrag);
        };

        let active_id = match active {
            BoardEntity::Quadrant(active_id) => {
                return Ok(DragEnd {
                    announcement: self.drop_quadrant(&active_id, over.as_ref()),
                    saved: None,
                });
            }
            BoardEntity::Item(active_id) => active_id,
        };

        let next = match over.as_ref() {
            Some(target) => self.arrange(&active_id, target),
            None => self.committed.clone(),
        };
        if next == self.committed {
            self.items = next;
            debug!("event=board_drag_end module=board status=ok entity=item changed=false");
            return Ok(DragEnd {
                announcement: self.item_announcement(&active_id, origin_quadrant.as_deref(), true),
                saved: None,
            });
        }

        self.items = next.clone();
        self.committed = next;
        let payload = quadrant_items_for_save(&self.committed, &self.real_quadrant_ids);
        if let Err(err) = store.save_quadrant_items(&payload) {
            warn!("event=board_drag_end module=board status=error entity=item error={err}");
            return Err(BoardError::Persistence(Box::new(err)));
        }

        debug!("event=board_drag_end module=board status=ok entity=item changed=true");
        Ok(DragEnd {
            announcement: self.item_announcement(&active_id, origin_quadrant.as_deref(), true),
            saved: Some(payload),
        })
    }

    pub fn drag_cancel(&mut self) -> Result<Option<String>, BoardError> {
        let DragState::Dragging { active, .. } =
            std::mem::replace(&mut self.drag, DragState::Idle)
        else {
            return Err(BoardError::NoActiveDrag);
        };
        self.items = self.committed.clone();
        debug!(
            "event=board_drag_cancel module=board status=ok entity={}",
            active.kind_label()
        );
        Ok(Some(format!("Dragging {} cancelled.", active.kind_label())))
    }

    /// Arrangement for dropping `active_id` on `target`, from the committed list.
    fn arrange(&self, active_id: &str, target: &BoardEntity) -> Vec<Item> {
        match target {
            BoardEntity::Item(over_id) => {
                reconcile_item_over_item(&self.committed, active_id, over_id)
            }
            BoardEntity::Quadrant(quadrant_id) if self.quadrant_index(quadrant_id).is_some() => {
                reconcile_item_over_quadrant(&self.committed, active_id, quadrant_id)
            }
            BoardEntity::Quadrant(_) => self.committed.clone(),
        }
    }

    fn drop_quadrant(&mut self, active_id: &str, over: Option<&BoardEntity>) -> Option<String> {
        let Some(BoardEntity::Quadrant(over_id)) = over else {
            return None;
        };
        let (Some(from), Some(to)) = (self.quadrant_index(active_id), self.quadrant_index(over_id))
        else {
            return None;
        };
        array_move(&mut self.quadrants, from, to);
        debug!("event=board_drag_end module=board status=ok entity=quadrant from={from} to={to}");
        Some(format!(
            "Quadrant {} was dropped into position {} of {}",
            self.quadrant_title(active_id),
            to + 1,
            self.quadrants.len()
        ))
    }

    fn item_announcement(
        &self,
        active_id: &str,
        origin_quadrant: Option<&str>,
        dropped: bool,
    ) -> Option<String> {
        let (quadrant_id, position, count) =
            position_in_quadrant(&self.items, active_id, &self.real_quadrant_ids)?;
        let title = self.quadrant_title(quadrant_id);
        let moved_quadrant = origin_quadrant != Some(quadrant_id);
        let message = match (dropped, moved_quadrant) {
            (false, true) => format!(
                "Item {} was moved over quadrant {title} in position {position} of {count}",
                self.item_label(active_id)
            ),
            (false, false) => {
                format!("Item was moved over position {position} of {count} in quadrant {title}")
            }
            (true, true) => {
                format!("Item was dropped into quadrant {title} in position {position} of {count}")
            }
            (true, false) => {
                format!("Item was dropped into position {position} of {count} in quadrant {title}")
            }
        };
        Some(message)
    }

    fn quadrant_index(&self, quadrant_id: &str) -> Option<usize> {
        self.quadrants
            .iter()
            .position(|quadrant| quadrant.id == quadrant_id)
    }

    fn quadrant_title<'a>(&'a self, quadrant_id: &'a str) -> &'a str {
        self.quadrants
            .iter()
            .find(|quadrant| quadrant.id == quadrant_id)
            .map_or(quadrant_id, |quadrant| quadrant.title.as_str())
    }

    fn item_label<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.items
            .iter()
            .find(|item| item.id == item_id)
            .map_or(item_id, Item::label)
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardController, BoardEntity, BoardError, DragState};
    use crate::board::store::QuadrantItemStore;
    use crate::model::item::{Item, QuadrantItems};
    use crate::model::topic::{Quadrant, INBOX_QUADRANT_ID};
    use std::cell::RefCell;
    use std::fmt::{Display, Formatter};

    #[derive(Debug)]
    struct StoreDown;

    impl Display for StoreDown {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "store down")
        }
    }

    impl std::error::Error for StoreDown {}

    #[derive(Default)]
    struct RecordingStore {
        calls: RefCell<Vec<Vec<QuadrantItems>>>,
        fail: bool,
    }

    impl QuadrantItemStore for RecordingStore {
        type Error = StoreDown;

        fn save_quadrant_items(&self, quadrants: &[QuadrantItems]) -> Result<(), StoreDown> {
            self.calls.borrow_mut().push(quadrants.to_vec());
            if self.fail {
                return Err(StoreDown);
            }
            Ok(())
        }
    }

    fn controller() -> BoardController {
        BoardController::new(
            vec![
                Quadrant::new("q1", "Do"),
                Quadrant::new("q2", "Plan"),
                Quadrant::new("q3", "Delegate"),
                Quadrant::new("q4", "Drop"),
            ],
            vec![
                Item::bookmark("bm_1", "q2", "Rust book"),
                Item::bookmark("bm_3", "q3", "Tokio"),
                Item::bookmark("bm_2", "q3", "Serde"),
                Item::memo("memo_1", "", "remember"),
            ],
        )
    }

    fn item(id: &str) -> BoardEntity {
        BoardEntity::Item(id.to_string())
    }

    fn quadrant(id: &str) -> BoardEntity {
        BoardEntity::Quadrant(id.to_string())
    }

    #[test]
    fn second_drag_start_is_rejected() {
        let mut board = controller();
        board.drag_start(item("bm_1")).unwrap();
        assert!(matches!(
            board.drag_start(item("bm_2")),
            Err(BoardError::DragInProgress)
        ));
    }

    #[test]
    fn pick_up_announces_origin_position() {
        let mut board = controller();
        let message = board.drag_start(item("bm_2")).unwrap().unwrap();
        assert_eq!(
            message,
            "Picked up item Serde at position 2 of 2 in quadrant Delegate"
        );
        assert_eq!(
            board.drag_state(),
            &DragState::Dragging {
                active: item("bm_2"),
                origin_quadrant: Some("q3".to_string()),
            }
        );
    }

    #[test]
    fn drag_over_previews_without_persisting_and_cancel_restores() {
        let mut board = controller();
        let committed = board.items().to_vec();
        board.drag_start(item("bm_1")).unwrap();
        board.drag_over(Some(item("bm_2"))).unwrap();
        assert_eq!(board.items()[1].id, "bm_1");
        assert_eq!(board.items()[1].quadrant_id, "q3");
        assert_eq!(board.committed_items(), committed.as_slice());

        // Preview depends only on committed state and the current target.
        board.drag_over(Some(item("bm_3"))).unwrap();
        board.drag_over(Some(item("bm_2"))).unwrap();
        assert_eq!(board.items()[1].id, "bm_1");

        let message = board.drag_cancel().unwrap();
        assert_eq!(message.as_deref(), Some("Dragging item cancelled."));
        assert_eq!(board.items(), committed.as_slice());
        assert!(!board.is_dragging());
    }

    #[test]
    fn drop_across_quadrants_persists_full_payload() {
        let mut board = controller();
        let store = RecordingStore::default();
        board.drag_start(item("bm_1")).unwrap();
        let outcome = board.drag_end(Some(item("bm_2")), &store).unwrap();

        let calls = store.calls.borrow();
        assert_eq!(calls.len(), 1);
        let saved = &calls[0];
        assert_eq!(saved.len(), 4);
        assert!(saved[1].items.is_empty());
        let q3: Vec<&str> = saved[2].items.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(q3, vec!["bm_3", "bm_1", "bm_2"]);
        assert_eq!(outcome.saved.as_ref(), Some(saved));
        assert_eq!(
            outcome.announcement.as_deref(),
            Some("Item was dropped into quadrant Delegate in position 2 of 3")
        );
        assert_eq!(board.committed_items(), board.items());
    }

    #[test]
    fn drop_on_self_does_not_persist() {
        let mut board = controller();
        let store = RecordingStore::default();
        board.drag_start(item("bm_1")).unwrap();
        board.drag_over(Some(item("bm_2"))).unwrap();
        let outcome = board.drag_end(Some(item("bm_1")), &store).unwrap();
        assert!(outcome.saved.is_none());
        assert!(store.calls.borrow().is_empty());
        assert_eq!(board.items(), board.committed_items());
    }

    #[test]
    fn failed_save_keeps_optimistic_arrangement() {
        let mut board = controller();
        let store = RecordingStore {
            fail: true,
            ..RecordingStore::default()
        };
        board.drag_start(item("memo_1")).unwrap();
        let error = board
            .drag_end(Some(quadrant("q1")), &store)
            .unwrap_err();

        assert_eq!(error.kind(), crate::error::ErrorKind::PersistenceFailure);
        let memo = board.items().iter().find(|i| i.id == "memo_1").unwrap();
        assert_eq!(memo.quadrant_id, "q1");
        assert_eq!(board.committed_items(), board.items());
        assert!(!board.is_dragging());
    }

    #[test]
    fn quadrant_drag_reorders_display_only() {
        let mut board = controller();
        let store = RecordingStore::default();
        board.drag_start(quadrant("q4")).unwrap();
        let outcome = board.drag_end(Some(quadrant("q1")), &store).unwrap();
        let order: Vec<&str> = board.quadrants().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(order, vec!["q4", "q1", "q2", "q3", "q-1", "q-2"]);
        assert_eq!(board.real_quadrant_ids()[0], "q1");
        assert!(outcome.saved.is_none());
        assert!(store.calls.borrow().is_empty());
    }

    #[test]
    fn end_and_cancel_require_active_drag() {
        let mut board = controller();
        let store = RecordingStore::default();
        assert!(matches!(
            board.drag_end(None, &store),
            Err(BoardError::NoActiveDrag)
        ));
        assert!(matches!(board.drag_cancel(), Err(BoardError::NoActiveDrag)));
        assert!(matches!(
            board.drag_start(item("bm_missing")),
            Err(BoardError::UnknownEntity(_))
        ));
        assert!(!board.is_dragging());
    }

    #[test]
    fn filter_applies_per_display_quadrant() {
        let mut board = controller();
        board.set_filter("  SERDE ");
        let visible: Vec<&str> = board
            .visible_items("q3")
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(visible, vec!["bm_2"]);
        assert!(board.visible_items(INBOX_QUADRANT_ID).is_empty());
    }
}
