//! Topic board engine.
//!
//! # Responsibility
//! - Reconcile drag-and-drop results into item arrangements (`reconcile`).
//! - Drive one board session's drag lifecycle (`controller`).
//! - Hand committed arrangements to durable storage (`store`).
//!
//! # Invariants
//! - Nothing here touches storage except through `QuadrantItemStore`.

pub mod controller;
pub mod reconcile;
pub mod store;

pub use controller::{BoardController, BoardEntity, BoardError, DragEnd, DragState};
pub use reconcile::{
    array_move, display_quadrant_id, items_in_quadrant, quadrant_items_for_save,
    reconcile_item_over_item, reconcile_item_over_quadrant,
};
pub use store::QuadrantItemStore;
