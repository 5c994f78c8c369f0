#![warn(missing_docs)]
//! Fitted Q-iteration on batches of transitions.
//!
//! [`Fqi`] learns an action-value function over a finite set of discrete
//! actions by repeatedly regressing a [`Regressor`] on Bellman targets
//! built from a fixed batch of `(s, a, s', absorbing)` transitions and
//! rewards. The greedy policy of the learned function is exposed through
//! [`Fqi::draw_action`] and the [`Policy`] trait.
//!
//! ```rust
//! use fqi_core::{dummy::LookupRegressor, BatchInput, FitOptions, Fqi, FqiConfig, QRegressor, TransitionBatch};
//! use ndarray::array;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = FqiConfig::default()
//!     .discrete_actions(vec![-1.0f32, 1.0])
//!     .discount_factor(0.9);
//! let mut fqi = Fqi::build(config, QRegressor::simple(LookupRegressor::new()))?;
//!
//! let batch = TransitionBatch::new(
//!     array![[0.0f32, -1.0, 1.0, 0.0], [1.0, 1.0, 2.0, 1.0], [2.0, -1.0, 0.0, 0.0]],
//!     array![1.0f32, 0.0, -1.0],
//! );
//! fqi.fit(batch, &FitOptions::default())?;
//! fqi.partial_fit(BatchInput::UseCached, &FitOptions::default())?;
//! assert_eq!(fqi.iteration(), 2);
//! # Ok(())
//! # }
//! ```
pub mod dummy;
pub mod error;
pub mod record;

mod action_set;
mod base;
mod batch;
mod features;
mod fqi;
mod preprocess;
mod trainer;

pub use action_set::{ActionSet, ActionSpec};
pub use base::{
    ActionRoute, FeatureTransform, FitOptions, Policy, QRegressor, Regressor, RoutedRegressor,
};
pub use batch::{BatchInput, TransitionBatch};
pub use error::FqiError;
pub use features::{select_features, FeaturesConfig, PolynomialFeatures};
pub use fqi::{EpsilonGreedy, ExploringPolicy, Fqi, FqiConfig, FqiExplorer};
pub use preprocess::{PreprocessedBatch, Preprocessor, StandardScaler};
pub use trainer::{Trainer, TrainerConfig};
