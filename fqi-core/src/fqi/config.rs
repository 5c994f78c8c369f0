//! Configuration of FQI.
use crate::{ActionSpec, FeaturesConfig};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Constructs [`Fqi`](super::Fqi).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FqiConfig {
    /// Dimension of states.
    pub state_dim: usize,

    /// Dimension of actions.
    pub action_dim: usize,

    /// Discrete actions among which the greedy action is chosen.
    pub discrete_actions: ActionSpec,

    /// Discount factor in `[0, 1]`.
    pub discount_factor: f64,

    /// Standardizes state-action inputs and rewards.
    #[serde(default)]
    pub scaled: bool,

    /// Feature transform applied to (scaled) state-action inputs.
    #[serde(default)]
    pub features: Option<FeaturesConfig>,

    /// Evaluates all actions with a single predict call when the regressor
    /// is not routed by action.
    #[serde(default)]
    pub batch_actions: bool,
}

impl Default for FqiConfig {
    fn default() -> Self {
        Self {
            state_dim: 1,
            action_dim: 1,
            discrete_actions: ActionSpec::default(),
            discount_factor: 0.99,
            scaled: false,
            features: None,
            batch_actions: false,
        }
    }
}

impl FqiConfig {
    /// Sets the dimension of states.
    pub fn state_dim(mut self, v: usize) -> Self {
        self.state_dim = v;
        self
    }

    /// Sets the dimension of actions.
    pub fn action_dim(mut self, v: usize) -> Self {
        self.action_dim = v;
        self
    }

    /// Sets the discrete actions.
    pub fn discrete_actions(mut self, v: impl Into<ActionSpec>) -> Self {
        self.discrete_actions = v.into();
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Input/output standardization.
    pub fn scaled(mut self, v: bool) -> Self {
        self.scaled = v;
        self
    }

    /// Feature transform.
    pub fn features(mut self, v: Option<FeaturesConfig>) -> Self {
        self.features = v;
        self
    }

    /// Single predict call over all actions.
    pub fn batch_actions(mut self, v: bool) -> Self {
        self.batch_actions = v;
        self
    }

    /// Loads [`FqiConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of FQI from {}", path_.display());
        Ok(b)
    }

    /// Saves [`FqiConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of FQI into {}", path_.display());
        Ok(())
    }
}
