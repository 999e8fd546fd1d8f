//! Erosion collaborator interface
//!
//! Hydrology lives outside this crate. Preset pipelines call into an
//! [`Erosion`] implementation at fixed points and treat it as opaque.

use crate::heightfield::HeightField;

/// Erosion and depression filling over a height field.
pub trait Erosion {
    /// Erode `field` by `amount`, repeated `iterations` times.
    fn erode<'m>(&self, field: &HeightField<'m>, amount: f64, iterations: usize) -> HeightField<'m>;

    /// Raise closed depressions so every node drains.
    fn fill_sinks<'m>(&self, field: &HeightField<'m>) -> HeightField<'m>;

    /// Per-node erosion rate for the given field.
    fn erosion_rate<'m>(&self, field: &HeightField<'m>) -> HeightField<'m>;
}

/// Leaves fields untouched and reports a zero erosion rate.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoErosion;

impl Erosion for NoErosion {
    fn erode<'m>(&self, field: &HeightField<'m>, _amount: f64, _iterations: usize) -> HeightField<'m> {
        field.clone()
    }

    fn fill_sinks<'m>(&self, field: &HeightField<'m>) -> HeightField<'m> {
        field.clone()
    }

    fn erosion_rate<'m>(&self, field: &HeightField<'m>) -> HeightField<'m> {
        field.map(|_| 0.0)
    }
}
