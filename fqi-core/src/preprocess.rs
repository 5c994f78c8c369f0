//! Preprocessing of transition batches.
mod scaler;
use crate::{error::FqiError, ActionSet, FeatureTransform, TransitionBatch};
use anyhow::Result;
pub use scaler::StandardScaler;
use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

/// Views of a transition batch prepared for regression.
///
/// Built by [`Preprocessor::preprocess`] and cached by [`Fqi`](crate::Fqi)
/// across iterations.
#[derive(Debug, Clone)]
pub struct PreprocessedBatch {
    /// Regressor inputs, the (scaled and featurized) `[state, action]` rows.
    pub(crate) sa: Array2<f32>,

    /// Raw next states; scaling and features are applied at greedy evaluation.
    pub(crate) snext: Array2<f32>,

    pub(crate) absorbing: Array1<f32>,

    /// Rewards, standardized if scaling is enabled.
    pub(crate) reward: Array1<f32>,

    /// Index in the action set of the action of each row.
    /// Computed only for routed regressors.
    pub(crate) action_ix: Option<Vec<usize>>,

    pub(crate) sa_scaler: Option<StandardScaler>,
    pub(crate) r_scaler: Option<StandardScaler>,
}

impl PreprocessedBatch {
    /// Regressor inputs.
    pub fn sa(&self) -> ArrayView2<f32> {
        self.sa.view()
    }

    /// Next states.
    pub fn snext(&self) -> ArrayView2<f32> {
        self.snext.view()
    }

    /// Absorbing flags.
    pub fn absorbing(&self) -> ArrayView1<f32> {
        self.absorbing.view()
    }

    /// Rewards as regressed on.
    pub fn reward(&self) -> ArrayView1<f32> {
        self.reward.view()
    }

    /// Action index of each row, if computed.
    pub fn action_ix(&self) -> Option<&[usize]> {
        self.action_ix.as_deref()
    }

    /// Scaler fitted on the state-action rows.
    pub fn sa_scaler(&self) -> Option<&StandardScaler> {
        self.sa_scaler.as_ref()
    }

    /// Scaler fitted on the rewards.
    pub fn r_scaler(&self) -> Option<&StandardScaler> {
        self.r_scaler.as_ref()
    }

    /// The number of transitions.
    pub fn len(&self) -> usize {
        self.sa.nrows()
    }

    /// Returns `true` if there are no transitions.
    pub fn is_empty(&self) -> bool {
        self.sa.nrows() == 0
    }
}

/// Splits transition batches into regression views.
///
/// Scaling statistics are estimated from scratch on every batch given to
/// [`Preprocessor::preprocess`]; they are not updated incrementally.
///
/// [`Fqi`](crate::Fqi) preprocesses new batches with a clone and keeps it
/// once the regressor fit succeeds.
pub struct Preprocessor {
    state_dim: usize,
    action_dim: usize,
    scaled: bool,
    features: Option<Box<dyn FeatureTransform>>,
}

impl Clone for Preprocessor {
    fn clone(&self) -> Self {
        Self {
            state_dim: self.state_dim,
            action_dim: self.action_dim,
            scaled: self.scaled,
            features: self.features.as_ref().map(|f| f.box_clone()),
        }
    }
}

impl Preprocessor {
    /// Constructs a preprocessor for the given dimensions.
    pub fn new(state_dim: usize, action_dim: usize, scaled: bool) -> Self {
        Self {
            state_dim,
            action_dim,
            scaled,
            features: None,
        }
    }

    /// Sets the feature transform applied after scaling.
    pub fn with_features(mut self, features: Option<Box<dyn FeatureTransform>>) -> Self {
        self.features = features;
        self
    }

    /// Replaces the feature transform.
    pub fn set_features(&mut self, features: Box<dyn FeatureTransform>) {
        self.features = Some(features);
    }

    /// Width of a row of a transition batch.
    pub fn sast_width(&self) -> usize {
        2 * self.state_dim + self.action_dim + 1
    }

    /// Splits `batch` into `sa`, `snext` and absorbing flags, fits the scalers
    /// and applies the feature transform.
    ///
    /// If `actions` is given, the action of every row is looked up in it.
    ///
    /// # Errors
    ///
    /// [`FqiError::ShapeError`] if the row width is not
    /// `2 * state_dim + action_dim + 1`, the batch is empty, the reward count
    /// differs from the row count, or an action is not in `actions`.
    pub fn preprocess(
        &mut self,
        batch: &TransitionBatch,
        actions: Option<&ActionSet>,
    ) -> Result<PreprocessedBatch> {
        let sast = &batch.sast;
        let width = self.sast_width();
        if sast.ncols() != width {
            return Err(FqiError::shape(format!(
                "expected rows of {} values (state_dim = {}, action_dim = {}), got {}",
                width,
                self.state_dim,
                self.action_dim,
                sast.ncols()
            ))
            .into());
        }
        if sast.nrows() == 0 {
            return Err(FqiError::shape("empty transition batch").into());
        }
        if batch.reward.len() != sast.nrows() {
            return Err(FqiError::shape(format!(
                "{} rewards given for {} transitions",
                batch.reward.len(),
                sast.nrows()
            ))
            .into());
        }

        let split = self.state_dim + self.action_dim;
        let sa = sast.slice(s![.., ..split]);
        let snext = sast.slice(s![.., split..split + self.state_dim]).to_owned();
        let absorbing = sast.column(width - 1).to_owned();

        let action_ix = match actions {
            None => None,
            Some(actions) => Some(
                sa.slice(s![.., self.state_dim..])
                    .outer_iter()
                    .enumerate()
                    .map(|(i, a)| {
                        actions.index_of(a).ok_or_else(|| {
                            FqiError::shape(format!("action {} of row {} is not in the action set", a, i))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let (sa_scaler, sa) = if self.scaled {
            let scaler = StandardScaler::fit(sa)?;
            let sa = scaler.transform(sa)?;
            (Some(scaler), sa)
        } else {
            (None, sa.to_owned())
        };

        let sa = match &mut self.features {
            Some(features) => features.apply(sa.view())?,
            None => sa,
        };

        let (r_scaler, reward) = self.scale_reward(batch.reward.view())?;
        debug!(
            "Preprocessed {} transitions into regressor inputs of width {}",
            sa.nrows(),
            sa.ncols()
        );

        Ok(PreprocessedBatch {
            sa,
            snext,
            absorbing,
            reward,
            action_ix,
            sa_scaler,
            r_scaler,
        })
    }

    /// Returns a copy of `cached` with its rewards replaced by `reward`.
    pub fn replace_reward(
        &self,
        cached: &PreprocessedBatch,
        reward: ArrayView1<f32>,
    ) -> Result<PreprocessedBatch> {
        if reward.len() != cached.len() {
            return Err(FqiError::shape(format!(
                "{} rewards given for {} cached transitions",
                reward.len(),
                cached.len()
            ))
            .into());
        }
        let (r_scaler, reward) = self.scale_reward(reward)?;
        Ok(PreprocessedBatch {
            reward,
            r_scaler,
            ..cached.clone()
        })
    }

    /// Applies the fit-time pipeline to evaluation rows `[state, action]`.
    pub fn transform_test(
        &self,
        sa: ArrayView2<f32>,
        sa_scaler: Option<&StandardScaler>,
    ) -> Result<Array2<f32>> {
        let sa = match sa_scaler {
            Some(scaler) => scaler.transform(sa)?,
            None => sa.to_owned(),
        };
        match &self.features {
            Some(features) => features.apply_test(sa.view()),
            None => Ok(sa),
        }
    }

    fn scale_reward(
        &self,
        reward: ArrayView1<f32>,
    ) -> Result<(Option<StandardScaler>, Array1<f32>)> {
        if self.scaled {
            let scaler = StandardScaler::fit1(reward)?;
            let reward = scaler.transform1(reward)?;
            Ok((Some(scaler), reward))
        } else {
            Ok((None, reward.to_owned()))
        }
    }
}
