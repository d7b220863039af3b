//! Quadrant reconciliation: pure list transforms for drag-and-drop results.
//!
//! # Responsibility
//! - Compute the next item arrangement for a drop on an item or a quadrant.
//! - Project an arrangement onto the persisted per-quadrant payload.
//! - Route unassigned items to the system quadrant matching their kind.
//!
//! # Invariants
//! - Every transform returns a permutation of its input; only the moved
//!   item's `quadrant_id` may change.
//! - Dropping an item on itself, or naming an unknown id, changes nothing.
//! - List order inside one quadrant is the persisted position order.

use crate::model::item::{Item, QuadrantItems};
use crate::model::topic::{QuadrantId, SystemQuadrant};

/// Moves the element at `from` so it ends up at index `to`.
///
/// Out-of-range indices leave the list untouched.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() || to >= items.len() || from == to {
        return;
    }
    let moved = items.remove(from);
    items.insert(to, moved);
}

/// Result of dropping `active_id` on the item `over_id`.
///
/// Across quadrants the active item adopts the target's quadrant and moves
/// to the index just above the target (`over_index - 1`, wrapping to the last
/// index when the target is first). Inside one quadrant this is a plain
/// sequence move to the target's index.
pub fn reconcile_item_over_item(items: &[Item], active_id: &str, over_id: &str) -> Vec<Item> {
    let mut next = items.to_vec();
    if active_id == over_id {
        return next;
    }
    let (Some(active_index), Some(over_index)) = (index_of(items, active_id), index_of(items, over_id))
    else {
        return next;
    };

    let target_quadrant = &items[over_index].quadrant_id;
    if items[active_index].quadrant_id == *target_quadrant {
        array_move(&mut next, active_index, over_index);
        return next;
    }

    next[active_index].quadrant_id = target_quadrant.clone();
    // One slot above the target; a target at the top sends the item to the end.
    let to = over_index.checked_sub(1).unwrap_or(next.len() - 1);
    array_move(&mut next, active_index, to);
    next
}

/// Result of dropping `active_id` on the quadrant `quadrant_id`.
///
/// Only the quadrant assignment changes; the item keeps its list index, so
/// its position inside the destination follows from the neighbours already
/// assigned there. A system quadrant id unassigns the item.
pub fn reconcile_item_over_quadrant(
    items: &[Item],
    active_id: &str,
    quadrant_id: &str,
) -> Vec<Item> {
    let mut next = items.to_vec();
    let Some(active_index) = index_of(items, active_id) else {
        return next;
    };
    let assigned = if SystemQuadrant::from_id(quadrant_id).is_some() {
        String::new()
    } else {
        quadrant_id.to_string()
    };
    next[active_index].quadrant_id = assigned;
    next
}

/// Builds the persisted payload: one entry per real quadrant, in the given
/// order, holding its items in list order.
///
/// Items outside the real quadrants are omitted.
pub fn quadrant_items_for_save(items: &[Item], real_quadrants: &[QuadrantId]) -> Vec<QuadrantItems> {
    real_quadrants
        .iter()
        .map(|quadrant_id| QuadrantItems {
            quadrant_id: quadrant_id.clone(),
            items: items
                .iter()
                .filter(|item| item.quadrant_id == *quadrant_id)
                .map(Item::to_ref)
                .collect(),
        })
        .collect()
}

/// Quadrant an item is displayed in.
///
/// Items not assigned to a real quadrant go to Inbox (bookmarks) or Memo
/// (memos); explicit system ids get no special treatment.
pub fn display_quadrant_id<'a>(item: &'a Item, real_quadrants: &[QuadrantId]) -> &'a str {
    if real_quadrants.contains(&item.quadrant_id) {
        item.quadrant_id.as_str()
    } else {
        SystemQuadrant::for_kind(item.kind()).id()
    }
}

/// Items displayed in `quadrant_id`, in list order.
pub fn items_in_quadrant<'a>(
    items: &'a [Item],
    quadrant_id: &str,
    real_quadrants: &[QuadrantId],
) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|item| display_quadrant_id(item, real_quadrants) == quadrant_id)
        .collect()
}

/// 1-based position of `item_id` inside its display quadrant, with the
/// quadrant's id and item count.
pub fn position_in_quadrant<'a>(
    items: &'a [Item],
    item_id: &str,
    real_quadrants: &[QuadrantId],
) -> Option<(&'a str, usize, usize)> {
    let item = items.iter().find(|item| item.id == item_id)?;
    let quadrant_id = display_quadrant_id(item, real_quadrants);
    let siblings = items_in_quadrant(items, quadrant_id, real_quadrants);
    let position = siblings.iter().position(|sibling| sibling.id == item_id)?;
    Some((quadrant_id, position + 1, siblings.len()))
}

fn index_of(items: &[Item], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::ItemKind;
    use crate::model::topic::{INBOX_QUADRANT_ID, MEMO_QUADRANT_ID};

    fn real() -> Vec<QuadrantId> {
        ["q1", "q2", "q3", "q4"].iter().map(|id| id.to_string()).collect()
    }

    fn board() -> Vec<Item> {
        vec![
            Item::bookmark("bm_0", "q1", "zero"),
            Item::bookmark("bm_1", "q2", "one"),
            Item::bookmark("bm_3", "q3", "three"),
            Item::bookmark("bm_2", "q3", "two"),
            Item::memo("memo_1", "", "note"),
            Item::bookmark("bm_9", "", "inbox"),
        ]
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn array_move_matches_sequence_semantics() {
        let mut values = vec!['a', 'b', 'c', 'd'];
        array_move(&mut values, 0, 2);
        assert_eq!(values, vec!['b', 'c', 'a', 'd']);
        array_move(&mut values, 3, 0);
        assert_eq!(values, vec!['d', 'b', 'c', 'a']);
        array_move(&mut values, 1, 9);
        assert_eq!(values, vec!['d', 'b', 'c', 'a']);
    }

    #[test]
    fn drop_on_self_or_unknown_is_noop() {
        let items = board();
        assert_eq!(reconcile_item_over_item(&items, "bm_1", "bm_1"), items);
        assert_eq!(reconcile_item_over_item(&items, "bm_x", "bm_1"), items);
        assert_eq!(reconcile_item_over_item(&items, "bm_1", "bm_x"), items);
        assert_eq!(reconcile_item_over_quadrant(&items, "bm_x", "q4"), items);
    }

    #[test]
    fn cross_quadrant_drop_from_above_lands_before_target() {
        let items = board();
        let next = reconcile_item_over_item(&items, "bm_1", "bm_2");

        assert_eq!(ids(&next), vec!["bm_0", "bm_3", "bm_1", "bm_2", "memo_1", "bm_9"]);
        let moved = next.iter().find(|item| item.id == "bm_1").unwrap();
        assert_eq!(moved.quadrant_id, "q3");

        let payload = quadrant_items_for_save(&next, &real());
        let q2: Vec<&str> = payload[1].items.iter().map(|r| r.item_id.as_str()).collect();
        let q3: Vec<&str> = payload[2].items.iter().map(|r| r.item_id.as_str()).collect();
        assert!(q2.is_empty());
        assert_eq!(q3, vec!["bm_3", "bm_1", "bm_2"]);
    }

    #[test]
    fn cross_quadrant_drop_from_below_moves_one_above_target() {
        let items = board();
        let next = reconcile_item_over_item(&items, "bm_2", "bm_1");
        assert_eq!(ids(&next), vec!["bm_2", "bm_0", "bm_1", "bm_3", "memo_1", "bm_9"]);
        assert_eq!(next[0].quadrant_id, "q2");

        let items = vec![
            Item::bookmark("a", "q1", "a"),
            Item::bookmark("b", "q1", "b"),
            Item::bookmark("c", "q2", "c"),
        ];
        let next = reconcile_item_over_item(&items, "c", "b");
        assert_eq!(ids(&next), vec!["c", "a", "b"]);
        assert_eq!(next[0].quadrant_id, "q1");
    }

    #[test]
    fn cross_quadrant_drop_on_first_item_wraps_to_end() {
        let items = board();
        let next = reconcile_item_over_item(&items, "bm_2", "bm_0");
        assert_eq!(ids(&next), vec!["bm_0", "bm_1", "bm_3", "memo_1", "bm_9", "bm_2"]);
        assert_eq!(next[5].quadrant_id, "q1");
    }

    #[test]
    fn cross_quadrant_drop_changes_only_active_quadrant() {
        let items = board();
        let next = reconcile_item_over_item(&items, "bm_0", "bm_3");
        for item in &next {
            let before = items.iter().find(|old| old.id == item.id).unwrap();
            if item.id == "bm_0" {
                assert_eq!(item.quadrant_id, "q3");
            } else {
                assert_eq!(item.quadrant_id, before.quadrant_id);
            }
        }
        assert_eq!(next.len(), items.len());
    }

    #[test]
    fn same_quadrant_drop_is_plain_move() {
        let items = board();
        let next = reconcile_item_over_item(&items, "bm_2", "bm_3");
        assert_eq!(ids(&next), vec!["bm_0", "bm_1", "bm_2", "bm_3", "memo_1", "bm_9"]);
        assert!(next.iter().all(|item| {
            let before = items.iter().find(|old| old.id == item.id).unwrap();
            before.quadrant_id == item.quadrant_id
        }));
    }

    #[test]
    fn drop_on_quadrant_keeps_list_index() {
        let items = board();
        let next = reconcile_item_over_quadrant(&items, "bm_9", "q1");
        assert_eq!(ids(&next), ids(&items));
        assert_eq!(next[5].quadrant_id, "q1");

        let payload = quadrant_items_for_save(&next, &real());
        let q1: Vec<&str> = payload[0].items.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(q1, vec!["bm_0", "bm_9"]);
    }

    #[test]
    fn drop_on_system_quadrant_unassigns() {
        let items = board();
        let next = reconcile_item_over_quadrant(&items, "bm_1", INBOX_QUADRANT_ID);
        assert_eq!(next[1].quadrant_id, "");
        assert_eq!(display_quadrant_id(&next[1], &real()), INBOX_QUADRANT_ID);
    }

    #[test]
    fn unassigned_items_are_routed_by_kind() {
        let mut items = board();
        items.push(Item::memo("memo_2", "qd_gone", "stale"));
        items.push(Item::bookmark("bm_q2", MEMO_QUADRANT_ID, "explicit"));

        let inbox: Vec<&str> = items_in_quadrant(&items, INBOX_QUADRANT_ID, &real())
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        let memos: Vec<&str> = items_in_quadrant(&items, MEMO_QUADRANT_ID, &real())
            .iter()
            .map(|item| item.id.as_str())
            .collect();

        assert_eq!(inbox, vec!["bm_9", "bm_q2"]);
        assert_eq!(memos, vec!["memo_1", "memo_2"]);
    }

    #[test]
    fn save_payload_covers_every_real_quadrant_and_skips_system_items() {
        let payload = quadrant_items_for_save(&board(), &real());
        assert_eq!(payload.len(), 4);
        assert_eq!(payload[3].items.len(), 0);
        assert!(payload
            .iter()
            .flat_map(|quadrant| quadrant.items.iter())
            .all(|item| item.item_type == ItemKind::Bookmark));
        let total: usize = payload.iter().map(|quadrant| quadrant.items.len()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn position_reports_one_based_rank() {
        let items = board();
        assert_eq!(position_in_quadrant(&items, "bm_2", &real()), Some(("q3", 2, 2)));
        assert_eq!(
            position_in_quadrant(&items, "memo_1", &real()),
            Some((MEMO_QUADRANT_ID, 1, 1))
        );
        assert_eq!(position_in_quadrant(&items, "nope", &real()), None);
    }
}
