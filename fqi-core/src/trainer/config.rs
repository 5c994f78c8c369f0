//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The maximum number of iterations, the first fit included.
    pub max_iterations: usize,

    /// Training stops when the maximal change of the targets between two
    /// iterations is not larger than this value.
    #[serde(default)]
    pub tolerance: Option<f32>,

    /// Interval of recording in iterations.
    pub record_interval: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 0,
            tolerance: None,
            record_interval: 1,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of iterations.
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.max_iterations = v;
        self
    }

    /// Sets the tolerance on the change of the targets.
    pub fn tolerance(mut self, v: f32) -> Self {
        self.tolerance = Some(v);
        self
    }

    /// Sets the interval of recording in iterations.
    pub fn record_interval(mut self, v: usize) -> Self {
        self.record_interval = v;
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of trainer from {}", path_.display());
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of trainer into {}", path_.display());
        Ok(())
    }
}
