//! Flutter-facing bindings for the Quadmark core.

pub mod api;
