//! Batch of transitions.
use crate::error::FqiError;
use anyhow::Result;
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};

/// A batch of transitions with their rewards.
///
/// Each row of `sast` is `[state, action, next_state, absorbing]`, i.e.
/// `state_dim + action_dim + state_dim + 1` values, where `absorbing` is 1
/// for transitions into an absorbing state and 0 otherwise.
/// `reward[i]` is the reward of row `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    /// Transitions, one per row.
    pub sast: Array2<f32>,

    /// Rewards.
    pub reward: Array1<f32>,
}

impl TransitionBatch {
    /// Constructs a batch from the flat layout.
    ///
    /// The shapes are checked when the batch is given to [`Fqi`](crate::Fqi).
    pub fn new(sast: Array2<f32>, reward: Array1<f32>) -> Self {
        Self { sast, reward }
    }

    /// Assembles the flat layout from separate arrays, row `i` of each
    /// belonging to transition `i`.
    pub fn from_parts(
        obs: ArrayView2<f32>,
        act: ArrayView2<f32>,
        next_obs: ArrayView2<f32>,
        reward: Vec<f32>,
        is_absorbing: &[i8],
    ) -> Result<Self> {
        let n = obs.nrows();
        if act.nrows() != n
            || next_obs.nrows() != n
            || reward.len() != n
            || is_absorbing.len() != n
        {
            return Err(FqiError::shape(format!(
                "row counts differ: obs {}, act {}, next_obs {}, reward {}, absorbing {}",
                n,
                act.nrows(),
                next_obs.nrows(),
                reward.len(),
                is_absorbing.len()
            ))
            .into());
        }

        let absorbing = Array1::from_iter(is_absorbing.iter().map(|v| *v as f32)).insert_axis(Axis(1));
        let sast = concatenate(Axis(1), &[obs.view(), act.view(), next_obs.view(), absorbing.view()])?;

        Ok(Self {
            sast,
            reward: Array1::from(reward),
        })
    }

    /// The number of transitions.
    pub fn len(&self) -> usize {
        self.sast.nrows()
    }

    /// Returns `true` if the batch has no transitions.
    pub fn is_empty(&self) -> bool {
        self.sast.nrows() == 0
    }
}

/// What [`Fqi::partial_fit`](crate::Fqi::partial_fit) regresses on.
#[derive(Debug, Clone)]
pub enum BatchInput {
    /// Reuse the transitions and rewards of the previous call.
    UseCached,

    /// Replace the cached transitions and rewards.
    NewBatch(TransitionBatch),

    /// Keep the cached transitions, replace their rewards.
    NewReward(Array1<f32>),
}

impl From<TransitionBatch> for BatchInput {
    fn from(batch: TransitionBatch) -> Self {
        Self::NewBatch(batch)
    }
}
