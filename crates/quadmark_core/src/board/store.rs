//! Persistence seam consumed by the board on drag end.

use crate::model::item::QuadrantItems;
use std::error::Error;

/// Durable sink for a board's quadrant memberships.
///
/// Implementations replace the full ordered content of every given quadrant
/// inside one transaction: either all quadrants are written or none is.
pub trait QuadrantItemStore {
    type Error: Error + 'static;

    fn save_quadrant_items(&self, quadrants: &[QuadrantItems]) -> Result<(), Self::Error>;
}

impl<S: QuadrantItemStore + ?Sized> QuadrantItemStore for &S {
    type Error = S::Error;

    fn save_quadrant_items(&self, quadrants: &[QuadrantItems]) -> Result<(), Self::Error> {
        (**self).save_quadrant_items(quadrants)
    }
}
