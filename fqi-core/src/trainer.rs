//! Train [`Fqi`].
mod config;
use crate::{
    error::FqiError, record::Recorder, BatchInput, FitOptions, Fqi, TransitionBatch,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::info;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the iterations of [`Fqi`] on a fixed batch of transitions.
///
/// # Training loop
///
/// 1. [`Fqi::fit`] on the batch, the first iteration.
/// 2. [`Fqi::partial_fit`] with [`BatchInput::UseCached`], re-targeting the
///    cached transitions with the previous action-value function.
/// 3. If the iteration is a multiple of `record_interval`, the record of the
///    iteration is written to the recorder.
/// 4. Training stops after `max_iterations` iterations, or as soon as the
///    maximal change of the targets falls to `tolerance` or below.
///    Otherwise back to step 2.
/// 5. The recorder is flushed.
///
/// ```mermaid
/// graph LR
///     A[TransitionBatch]-->|fit|B[Fqi]
///     B-->|UseCached|B
///     B-->|Record|C[Recorder]
/// ```
pub struct Trainer {
    max_iterations: usize,
    tolerance: Option<f32>,
    record_interval: usize,
}

impl Trainer {
    /// Constructs a trainer.
    ///
    /// # Errors
    ///
    /// [`FqiError::ConfigError`] if `max_iterations` or `record_interval` is 0.
    pub fn build(config: TrainerConfig) -> Result<Self> {
        if config.max_iterations == 0 {
            return Err(FqiError::config("max_iterations must be positive").into());
        }
        if config.record_interval == 0 {
            return Err(FqiError::config("record_interval must be positive").into());
        }
        Ok(Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            record_interval: config.record_interval,
        })
    }

    /// Trains `fqi` on `batch`, returns the number of iterations performed.
    pub fn train(
        &self,
        fqi: &mut Fqi,
        batch: TransitionBatch,
        opts: &FitOptions,
        recorder: &mut dyn Recorder,
    ) -> Result<usize> {
        let mut record = fqi.fit(batch, opts)?;

        loop {
            let iteration = fqi.iteration();
            if iteration % self.record_interval == 0 {
                recorder.write(record);
            }

            if iteration >= self.max_iterations {
                break;
            }
            if let (Some(tol), Some(delta)) = (self.tolerance, fqi.last_target_delta()) {
                if delta <= tol {
                    info!(
                        "Targets converged at iteration {} (delta = {} <= {})",
                        iteration, delta, tol
                    );
                    break;
                }
            }

            record = fqi.partial_fit(BatchInput::UseCached, opts)?;
        }

        let iterations = fqi.iteration();
        recorder.flush(iterations as _);
        info!("Finished training after {} iterations", iterations);
        Ok(iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::FnRegressor,
        record::{BufferedRecorder, NullRecorder},
        FqiConfig, QRegressor,
    };
    use ndarray::array;

    fn fqi() -> Result<Fqi> {
        let config = FqiConfig::default()
            .discrete_actions(vec![-1.0f32, 1.0])
            .discount_factor(0.9);
        Fqi::build(config, QRegressor::simple(FnRegressor::new(|_| 2.0)))
    }

    fn batch() -> TransitionBatch {
        TransitionBatch::new(
            array![[0.0f32, -1.0, 1.0, 0.0], [1.0, 1.0, 2.0, 1.0]],
            array![1.0f32, 0.0],
        )
    }

    #[test]
    fn test_zero_iterations_is_rejected() {
        let err = Trainer::build(TrainerConfig::default()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<FqiError>(),
            Some(FqiError::ConfigError(_))
        ));
    }

    #[test]
    fn test_max_iterations() -> Result<()> {
        let mut fqi = fqi()?;
        let mut recorder = BufferedRecorder::new();
        let trainer = Trainer::build(TrainerConfig::default().max_iterations(4))?;
        let n = trainer.train(&mut fqi, batch(), &FitOptions::default(), &mut recorder)?;

        assert_eq!(n, 4);
        assert_eq!(fqi.iteration(), 4);
        assert_eq!(recorder.len(), 4);
        assert_eq!(recorder.n_flushes(), 1);
        Ok(())
    }

    #[test]
    fn test_null_recorder() -> Result<()> {
        let mut fqi = fqi()?;
        let trainer = Trainer::build(TrainerConfig::default().max_iterations(2))?;
        let n = trainer.train(&mut fqi, batch(), &FitOptions::default(), &mut NullRecorder::new())?;
        assert_eq!(n, 2);
        Ok(())
    }

    #[test]
    fn test_tolerance_stops_early() -> Result<()> {
        // Targets of the 2nd and 3rd iterations are equal for a constant Q
        let mut fqi = fqi()?;
        let mut recorder = BufferedRecorder::new();
        let config = TrainerConfig::default()
            .max_iterations(100)
            .tolerance(1e-6)
            .record_interval(2);
        let n = Trainer::build(config)?.train(
            &mut fqi,
            batch(),
            &FitOptions::default(),
            &mut recorder,
        )?;

        assert_eq!(n, 3);
        assert_eq!(recorder.len(), 1);
        let record = recorder.iter().next().unwrap();
        assert_eq!(record.get_scalar("iteration")?, 2.0);
        Ok(())
    }
}
