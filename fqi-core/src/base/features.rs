//! Feature transform.
use anyhow::Result;
use ndarray::{Array2, ArrayView2};

/// Maps state-action rows to the representation consumed by the regressor.
///
/// `apply` and `apply_test` must produce the same features for the same rows.
/// Transforms with state learned in `apply` are applied to a copy made with
/// `box_clone`, which replaces the original only if the fit succeeds.
pub trait FeatureTransform {
    /// Transforms training rows.
    fn apply(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Transforms rows at evaluation time.
    fn apply_test(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Copies the transform with its state.
    fn box_clone(&self) -> Box<dyn FeatureTransform>;
}
