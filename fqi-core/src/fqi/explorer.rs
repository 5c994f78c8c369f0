//! Exploration strategies on top of the greedy policy of FQI.
use super::Fqi;
use crate::Policy;
use anyhow::Result;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Explorers for FQI.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum FqiExplorer {
    /// Always takes the greedy action.
    Greedy,

    /// Epsilon-greedy action selection.
    EpsilonGreedy(EpsilonGreedy),
}

/// Epsilon-greedy explorer for FQI.
///
/// Epsilon decays linearly from `eps_start` to `eps_final` over
/// `final_step` draws, then stays at `eps_final`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// The number of draws so far.
    pub n_draws: usize,

    /// Epsilon at the first draw.
    pub eps_start: f64,

    /// Epsilon after `final_step` draws.
    pub eps_final: f64,

    /// The number of draws over which epsilon decays.
    pub final_step: usize,
}

#[allow(clippy::new_without_default)]
impl EpsilonGreedy {
    /// Constructs epsilon-greedy explorer.
    pub fn new() -> Self {
        Self {
            n_draws: 0,
            eps_start: 1.0,
            eps_final: 0.02,
            final_step: 100_000,
        }
    }

    /// Constructs epsilon-greedy explorer.
    pub fn with_final_step(final_step: usize) -> FqiExplorer {
        FqiExplorer::EpsilonGreedy(Self {
            final_step,
            ..Self::new()
        })
    }

    /// The current value of epsilon.
    pub fn eps(&self) -> f64 {
        if self.final_step == 0 {
            return self.eps_final;
        }
        let d = (self.eps_start - self.eps_final) / (self.final_step as f64);
        (self.eps_start - d * self.n_draws as f64).max(self.eps_final)
    }

    /// Chooses an action index for each state.
    ///
    /// * `best` - indices of the greedy actions.
    pub fn action(&mut self, best: &[usize], n_actions: usize, rng: &mut impl Rng) -> Vec<usize> {
        let eps = self.eps() as f32;
        self.n_draws += 1;

        best.iter()
            .map(|&b| match rng.gen::<f32>() < eps {
                true => rng.gen_range(0..n_actions),
                false => b,
            })
            .collect()
    }

    /// Set the epsilon value at the final step.
    pub fn eps_final(self, v: f64) -> Self {
        let mut s = self;
        s.eps_final = v;
        s
    }

    /// Set the epsilon value at the start.
    pub fn eps_start(self, v: f64) -> Self {
        let mut s = self;
        s.eps_start = v;
        s
    }
}

/// A policy exploring around the greedy policy of a trained [`Fqi`].
pub struct ExploringPolicy<'a> {
    fqi: &'a Fqi,
    explorer: FqiExplorer,
    rng: SmallRng,
}

impl<'a> ExploringPolicy<'a> {
    /// Constructs the policy with a seeded random number generator.
    pub fn new(fqi: &'a Fqi, explorer: FqiExplorer, seed: u64) -> Self {
        Self {
            fqi,
            explorer,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// The explorer.
    pub fn explorer(&self) -> &FqiExplorer {
        &self.explorer
    }
}

impl Policy for ExploringPolicy<'_> {
    fn sample(
        &mut self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
    ) -> Result<Array2<f32>> {
        let (_, best) = self.fqi.greedy(states, absorbing, false)?;
        let actions = self.fqi.actions();
        let ix = match &mut self.explorer {
            FqiExplorer::Greedy => best,
            FqiExplorer::EpsilonGreedy(eg) => eg.action(&best, actions.len(), &mut self.rng),
        };
        Ok(actions.as_array().select(Axis(0), &ix))
    }
}
