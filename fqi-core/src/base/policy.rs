//! Policy.
use anyhow::Result;
use ndarray::{Array2, ArrayView1, ArrayView2};

/// A policy on batches of states.
///
/// Policy is a mapping from states to actions, deterministic or stochastic.
pub trait Policy {
    /// Draws an action for each row of `states`.
    ///
    /// `absorbing[i]` is 1 if state `i` is absorbing, 0 otherwise.
    /// The returned array has one action (a row of `action_dim` values) per state.
    fn sample(
        &mut self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
    ) -> Result<Array2<f32>>;
}
