//! Regressors approximating the action-value function.
use crate::record::Record;
use anyhow::Result;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Options passed to every call of a regressor's `fit`.
///
/// Learners that do not train iteratively ignore them.
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Clone)]
pub struct FitOptions {
    /// The number of passes over the training rows.
    #[serde(default)]
    pub n_epochs: Option<usize>,

    /// Mini-batch size.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl FitOptions {
    /// Sets the number of epochs.
    pub fn n_epochs(mut self, v: usize) -> Self {
        self.n_epochs = Some(v);
        self
    }

    /// Sets the mini-batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = Some(v);
        self
    }
}

/// Something that can be fit to `(x, y)` and predicts `y` given `x`.
///
/// Rows of `x` are (possibly scaled and featurized) state-action pairs.
pub trait Regressor {
    /// Fits the regressor to the given rows and targets.
    ///
    /// The returned record is merged into the record of the iteration.
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, opts: &FitOptions) -> Result<Record>;

    /// Predicts a value for each row of `x`.
    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>>;

    /// Called before the fit of every bootstrapped iteration.
    ///
    /// Ensembles growing with the iterations prepare a member here. Predictions
    /// must not change before the following `fit` succeeds, and a later
    /// `adapt` replaces a member prepared for a fit that failed.
    fn adapt(&mut self, _iteration: usize) -> Result<()> {
        Ok(())
    }

    /// An untrained regressor with the same configuration.
    ///
    /// [`Fqi`](crate::Fqi) fits a fresh regressor on every first iteration and
    /// keeps the current one if that fit fails.
    fn fresh(&self) -> Box<dyn Regressor>;
}

/// Selects the ensemble member evaluated for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRoute {
    /// The number of actions in the action set.
    pub n_actions: usize,

    /// Index of the action in the action set.
    pub idx: usize,
}

/// A regressor composed of per-action members.
///
/// Training rows come with the index of their action in the action set,
/// and prediction can be routed to the member of a given action.
pub trait RoutedRegressor {
    /// Fits the members; `action_ix[i]` is the action index of row `i`.
    fn fit(
        &mut self,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        action_ix: &[usize],
        n_actions: usize,
        opts: &FitOptions,
    ) -> Result<Record>;

    /// Predicts a value for each row of `x`.
    ///
    /// With `route == None` the regressor has to find the member of each row
    /// by itself.
    fn predict(&self, x: ArrayView2<f32>, route: Option<ActionRoute>) -> Result<Array1<f32>>;

    /// See [`Regressor::adapt`].
    fn adapt(&mut self, _iteration: usize) -> Result<()> {
        Ok(())
    }

    /// See [`Regressor::fresh`].
    fn fresh(&self) -> Box<dyn RoutedRegressor>;
}

/// The regressor owned by [`Fqi`](crate::Fqi).
///
/// The variant decides, once at construction, whether greedy evaluation
/// passes routing parameters to the regressor.
pub enum QRegressor {
    /// A single function of the state-action row.
    Simple(Box<dyn Regressor>),

    /// An ensemble routed by action index.
    EnsembleRouted(Box<dyn RoutedRegressor>),
}

impl QRegressor {
    /// Wraps a plain regressor.
    pub fn simple(r: impl Regressor + 'static) -> Self {
        Self::Simple(Box::new(r))
    }

    /// Wraps a routed ensemble.
    pub fn routed(r: impl RoutedRegressor + 'static) -> Self {
        Self::EnsembleRouted(Box::new(r))
    }

    /// Returns `true` for [`QRegressor::EnsembleRouted`].
    pub fn is_routed(&self) -> bool {
        matches!(self, Self::EnsembleRouted(_))
    }

    /// Fits the regressor.
    ///
    /// `action_ix` is required by routed ensembles and ignored otherwise.
    pub(crate) fn fit(
        &mut self,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        action_ix: Option<&[usize]>,
        n_actions: usize,
        opts: &FitOptions,
    ) -> Result<Record> {
        match self {
            Self::Simple(r) => r.fit(x, y, opts),
            Self::EnsembleRouted(r) => {
                let action_ix = action_ix.ok_or_else(|| {
                    crate::FqiError::shape("action indices of training rows are not available")
                })?;
                r.fit(x, y, action_ix, n_actions, opts)
            }
        }
    }

    /// Predicts values; `route` is used only by routed ensembles.
    pub(crate) fn predict(
        &self,
        x: ArrayView2<f32>,
        route: Option<ActionRoute>,
    ) -> Result<Array1<f32>> {
        match self {
            Self::Simple(r) => r.predict(x),
            Self::EnsembleRouted(r) => r.predict(x, route),
        }
    }

    pub(crate) fn adapt(&mut self, iteration: usize) -> Result<()> {
        match self {
            Self::Simple(r) => r.adapt(iteration),
            Self::EnsembleRouted(r) => r.adapt(iteration),
        }
    }

    pub(crate) fn fresh(&self) -> Self {
        match self {
            Self::Simple(r) => Self::Simple(r.fresh()),
            Self::EnsembleRouted(r) => Self::EnsembleRouted(r.fresh()),
        }
    }
}
