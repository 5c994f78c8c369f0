//! FQI engine.
use super::{greedy::GreedyEvaluator, FqiConfig};
use crate::{
    error::FqiError,
    features::select_features,
    preprocess::PreprocessedBatch,
    record::{Record, RecordValue},
    ActionSet, BatchInput, FeatureTransform, FitOptions, Policy, Preprocessor, QRegressor,
    TransitionBatch,
};
use anyhow::Result;
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Fitted Q-iteration over a fixed set of discrete actions.
///
/// # Iterations
///
/// The first iteration, [`Fqi::fit`], regresses the action-value function on
/// the immediate rewards. Every following iteration, [`Fqi::partial_fit`],
/// regresses it on the Bellman targets
///
/// `y_i = r_i + gamma * max_a Q(s'_i, a) * (1 - absorbing_i)`
///
/// where `Q` is the regressor fitted in the previous iteration.
///
/// ```mermaid
/// graph LR
///     A[TransitionBatch]-->B[Preprocessor]
///     B-->|sa, r|D[QRegressor::fit]
///     B-->|snext, absorbing|C[greedy evaluation]
///     D-->|previous Q|C
///     C-->|Bellman targets|D
/// ```
///
/// The preprocessed batch is cached, so later iterations can re-target the
/// same samples with [`BatchInput::UseCached`]. A call that fails leaves the
/// iteration counter, the cache, the targets, the feature transform and the
/// predictions of the regressor as they were.
pub struct Fqi {
    state_dim: usize,
    discount_factor: f32,
    batch_actions: bool,
    actions: ActionSet,
    preprocessor: Preprocessor,
    regressor: QRegressor,

    /// 0 until the first successful fit.
    iteration: usize,
    cache: Option<PreprocessedBatch>,
    targets: Option<Array1<f32>>,
    target_delta: Option<f32>,
}

impl Fqi {
    /// Constructs an untrained engine.
    ///
    /// # Errors
    ///
    /// [`FqiError::ConfigError`] for an invalid action set, `state_dim == 0`,
    /// a discount factor outside `[0, 1]` or an invalid feature configuration.
    pub fn build(config: FqiConfig, regressor: QRegressor) -> Result<Self> {
        if config.state_dim == 0 {
            return Err(FqiError::config("state_dim must be positive").into());
        }
        if !(0.0..=1.0).contains(&config.discount_factor) {
            return Err(FqiError::config(format!(
                "discount factor must be in [0, 1], got {}",
                config.discount_factor
            ))
            .into());
        }
        let actions = ActionSet::new(&config.discrete_actions, config.action_dim)?;
        let features = select_features(config.features.as_ref())?;
        let preprocessor = Preprocessor::new(config.state_dim, config.action_dim, config.scaled)
            .with_features(features);

        info!(
            "Build FQI: state_dim = {}, {} actions of dimension {}, discount factor = {}, routed = {}",
            config.state_dim,
            actions.len(),
            actions.action_dim(),
            config.discount_factor,
            regressor.is_routed()
        );

        Ok(Self {
            state_dim: config.state_dim,
            discount_factor: config.discount_factor as f32,
            batch_actions: config.batch_actions,
            actions,
            preprocessor,
            regressor,
            iteration: 0,
            cache: None,
            targets: None,
            target_delta: None,
        })
    }

    /// Installs a custom feature transform, replacing the configured one.
    pub fn with_features(mut self, features: impl FeatureTransform + 'static) -> Self {
        self.preprocessor.set_features(Box::new(features));
        self
    }

    /// First iteration: preprocesses `batch` and fits a fresh regressor to
    /// the immediate rewards.
    ///
    /// On success this acts as [`Fqi::reset`] followed by the first
    /// iteration, so the iteration counter becomes 1 whatever its previous
    /// value. On failure the engine keeps its previous state.
    pub fn fit(&mut self, batch: TransitionBatch, opts: &FitOptions) -> Result<Record> {
        let (preprocessor, prep) = self.preprocess(&batch)?;
        self.fit_rewards(Some(preprocessor), prep, opts, "fit")
    }

    /// Next iteration: fits the regressor to the Bellman targets computed
    /// with the regressor of the previous iteration.
    ///
    /// On an untrained engine, [`BatchInput::NewBatch`] behaves as [`Fqi::fit`].
    ///
    /// # Errors
    ///
    /// [`FqiError::NotFittedError`] if `input` refers to the cache and
    /// nothing is cached, [`FqiError::ShapeError`] for a malformed batch.
    pub fn partial_fit(&mut self, input: BatchInput, opts: &FitOptions) -> Result<Record> {
        let (input_name, staged, fresh) = match input {
            BatchInput::UseCached => ("use_cached", None, None),
            BatchInput::NewBatch(batch) => {
                let (preprocessor, prep) = self.preprocess(&batch)?;
                ("new_batch", Some(preprocessor), Some(prep))
            }
            BatchInput::NewReward(reward) => {
                let cached = self.cache.as_ref().ok_or_else(Self::nothing_cached)?;
                let prep = self.preprocessor.replace_reward(cached, reward.view())?;
                ("new_reward", None, Some(prep))
            }
        };

        if self.iteration == 0 {
            return match fresh {
                Some(prep) => self.fit_rewards(staged, prep, opts, input_name),
                None => Err(Self::nothing_cached().into()),
            };
        }

        let prep = match &fresh {
            Some(prep) => prep,
            None => self.cache.as_ref().ok_or_else(Self::nothing_cached)?,
        };
        let preprocessor = staged.as_ref().unwrap_or(&self.preprocessor);

        let y = self.bellman_targets(preprocessor, prep)?;
        self.regressor.adapt(self.iteration)?;
        let record = self.regressor.fit(
            prep.sa.view(),
            y.view(),
            prep.action_ix(),
            self.actions.len(),
            opts,
        )?;

        if let Some(preprocessor) = staged {
            self.preprocessor = preprocessor;
        }
        if let Some(prep) = fresh {
            self.cache = Some(prep);
        }
        Ok(self.commit(y, record, input_name))
    }

    /// Maximal action value and maximizing action of each state.
    ///
    /// Returns `(max_q, max_action)`, where `max_action` has one row of
    /// `action_dim` values per state, taken from the action set. Absorbing
    /// states have `max_q == 0` and the first action. Ties go to the action
    /// with the lowest index.
    ///
    /// With `evaluation == true`, routed ensembles are not given the action
    /// index and route each row by themselves.
    ///
    /// # Errors
    ///
    /// [`FqiError::NotFittedError`] before the first successful fit,
    /// [`FqiError::ShapeError`] if `states` does not have `state_dim` columns
    /// or `absorbing` has a different row count.
    pub fn max_qa(
        &self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
        evaluation: bool,
    ) -> Result<(Array1<f32>, Array2<f32>)> {
        let (max_q, argmax) = self.greedy(states, absorbing, evaluation)?;
        Ok((max_q, self.actions.as_array().select(Axis(0), &argmax)))
    }

    /// The action with the highest value in each state.
    pub fn draw_action(
        &self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
        evaluation: bool,
    ) -> Result<Array2<f32>> {
        let (_, max_action) = self.max_qa(states, absorbing, evaluation)?;
        Ok(max_action)
    }

    /// Action values of every action in each state, one column per action.
    pub fn q_values(
        &self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
        evaluation: bool,
    ) -> Result<Array2<f32>> {
        let prep = self.check_query(states, absorbing)?;
        self.evaluator(&self.preprocessor, prep)
            .q_values(states, absorbing, evaluation)
    }

    /// Maximal action values and indices of the maximizing actions.
    pub(crate) fn greedy(
        &self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
        evaluation: bool,
    ) -> Result<(Array1<f32>, Vec<usize>)> {
        let prep = self.check_query(states, absorbing)?;
        self.evaluator(&self.preprocessor, prep)
            .evaluate(states, absorbing, evaluation)
    }

    /// Back to the untrained state.
    ///
    /// The action set and the configuration are kept; the regressor is
    /// replaced by a fresh one.
    pub fn reset(&mut self) {
        self.iteration = 0;
        self.cache = None;
        self.targets = None;
        self.target_delta = None;
        self.regressor = self.regressor.fresh();
        debug!("Reset FQI");
    }

    /// The number of successful fits since construction or the last reset.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// The action set.
    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    /// Discount factor.
    pub fn discount_factor(&self) -> f32 {
        self.discount_factor
    }

    /// Targets of the last fit.
    pub fn targets(&self) -> Option<ArrayView1<f32>> {
        self.targets.as_ref().map(|t| t.view())
    }

    /// `max_i |y_i(k) - y_i(k - 1)|` between the targets of the last two
    /// fits, if they were computed on the same number of transitions.
    pub fn last_target_delta(&self) -> Option<f32> {
        self.target_delta
    }

    /// The cached preprocessed batch.
    pub fn cached(&self) -> Option<&PreprocessedBatch> {
        self.cache.as_ref()
    }

    /// The regressor.
    pub fn regressor(&self) -> &QRegressor {
        &self.regressor
    }

    fn nothing_cached() -> FqiError {
        FqiError::not_fitted("no transitions are cached, a batch must be given")
    }

    /// Preprocesses `batch` with a copy of the preprocessor, returned along
    /// with the batch so that it can be kept once the fit succeeds.
    fn preprocess(&self, batch: &TransitionBatch) -> Result<(Preprocessor, PreprocessedBatch)> {
        let actions = match self.regressor.is_routed() {
            true => Some(&self.actions),
            false => None,
        };
        let mut preprocessor = self.preprocessor.clone();
        let prep = preprocessor.preprocess(batch, actions)?;
        Ok((preprocessor, prep))
    }

    /// Fits a fresh regressor on the rewards.
    fn fit_rewards(
        &mut self,
        staged: Option<Preprocessor>,
        prep: PreprocessedBatch,
        opts: &FitOptions,
        input_name: &str,
    ) -> Result<Record> {
        let y = prep.reward.clone();
        let mut regressor = self.regressor.fresh();
        let record = regressor.fit(
            prep.sa.view(),
            y.view(),
            prep.action_ix(),
            self.actions.len(),
            opts,
        )?;

        self.regressor = regressor;
        if let Some(preprocessor) = staged {
            self.preprocessor = preprocessor;
        }
        self.cache = Some(prep);
        self.iteration = 0;
        self.targets = None;
        Ok(self.commit(y, record, input_name))
    }

    fn bellman_targets(
        &self,
        preprocessor: &Preprocessor,
        prep: &PreprocessedBatch,
    ) -> Result<Array1<f32>> {
        let (max_q, _) = self
            .evaluator(preprocessor, prep)
            .evaluate(prep.snext.view(), prep.absorbing.view(), false)?;
        Ok(&prep.reward + &(max_q * self.discount_factor))
    }

    /// Bookkeeping after a successful fit.
    fn commit(&mut self, y: Array1<f32>, record: Record, input_name: &str) -> Record {
        self.iteration += 1;
        self.target_delta = match &self.targets {
            Some(prev) if prev.len() == y.len() => Some(
                prev.iter()
                    .zip(y.iter())
                    .fold(0f32, |acc, (a, b)| acc.max((a - b).abs())),
            ),
            _ => None,
        };
        let target_mean = y.mean().unwrap_or(0.0);

        let mut record = record;
        record.merge_inplace(Record::from_slice(&[
            ("iteration", RecordValue::Scalar(self.iteration as f32)),
            ("target_mean", RecordValue::Scalar(target_mean)),
            ("targets", RecordValue::Array1(y.to_vec())),
            ("input", RecordValue::String(input_name.to_string())),
        ]));
        if let Some(delta) = self.target_delta {
            record.insert("target_delta", RecordValue::Scalar(delta));
        }

        info!(
            "FQI iteration {}: {} targets, mean = {}, delta = {:?}",
            self.iteration,
            y.len(),
            target_mean,
            self.target_delta
        );
        self.targets = Some(y);
        record
    }

    fn check_query(
        &self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
    ) -> Result<&PreprocessedBatch> {
        let prep = match (self.iteration, &self.cache) {
            (0, _) | (_, None) => {
                return Err(FqiError::not_fitted(
                    "the model must be trained before being evaluated",
                )
                .into())
            }
            (_, Some(prep)) => prep,
        };
        if states.ncols() != self.state_dim {
            return Err(FqiError::shape(format!(
                "states must have {} columns, got {}",
                self.state_dim,
                states.ncols()
            ))
            .into());
        }
        if absorbing.len() != states.nrows() {
            return Err(FqiError::shape(format!(
                "{} absorbing flags given for {} states",
                absorbing.len(),
                states.nrows()
            ))
            .into());
        }
        Ok(prep)
    }

    fn evaluator<'a>(
        &'a self,
        preprocessor: &'a Preprocessor,
        prep: &'a PreprocessedBatch,
    ) -> GreedyEvaluator<'a> {
        GreedyEvaluator {
            preprocessor,
            regressor: &self.regressor,
            actions: &self.actions,
            sa_scaler: prep.sa_scaler(),
            batch_actions: self.batch_actions,
        }
    }
}

impl Policy for Fqi {
    /// Greedy action.
    fn sample(
        &mut self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
    ) -> Result<Array2<f32>> {
        self.draw_action(states, absorbing, false)
    }
}
