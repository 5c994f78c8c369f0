//! Ensemble of regressors fitted on residuals.
use anyhow::Result;
use fqi_core::{
    record::{Record, RecordValue},
    FitOptions, Regressor,
};
use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::rc::Rc;

/// Sum of regressors, one added per iteration of FQI.
///
/// [`Regressor::adapt`] announces a member for the given iteration; the next
/// call of [`Regressor::fit`] builds it with the factory, trains it on the
/// part of the targets the current members do not explain, and appends it
/// if the fit succeeds. Without an announced member, `fit` trains a
/// replacement for the last member instead.
///
/// The factory receives the iteration number, e.g. to grow the capacity of
/// later members.
pub struct ResidualEnsemble {
    factory: Rc<dyn Fn(usize) -> Box<dyn Regressor>>,

    /// Members with the iteration they were built for.
    members: Vec<(usize, Box<dyn Regressor>)>,

    /// Iteration of the member to be appended by the next fit.
    pending: Option<usize>,
}

impl ResidualEnsemble {
    /// Constructs an empty ensemble; the first fit adds the member of
    /// iteration 0.
    pub fn new<R, F>(factory: F) -> Self
    where
        R: Regressor + 'static,
        F: Fn(usize) -> R + 'static,
    {
        Self {
            factory: Rc::new(move |i| Box::new(factory(i)) as Box<dyn Regressor>),
            members: vec![],
            pending: Some(0),
        }
    }

    /// The number of fitted members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` before the first successful fit.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sum of the predictions of the first `n` members.
    fn predict_first(&self, x: ArrayView2<f32>, n: usize) -> Result<Array1<f32>> {
        let mut out = Array1::<f32>::zeros(x.nrows());
        for (_, m) in &self.members[..n] {
            out += &m.predict(x)?;
        }
        Ok(out)
    }
}

impl Regressor for ResidualEnsemble {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, opts: &FitOptions) -> Result<Record> {
        let n = self.members.len();
        let (iteration, kept) = match (self.pending, self.members.last()) {
            (Some(iteration), _) => (iteration, n),
            (None, Some((iteration, _))) => (*iteration, n - 1),
            (None, None) => (0, 0),
        };

        let residual = &y - &self.predict_first(x, kept)?;
        let mut member = (self.factory)(iteration);
        let mut record = member.fit(x, residual.view(), opts)?;

        self.members.truncate(kept);
        self.members.push((iteration, member));
        self.pending = None;
        debug!("Fitted member {} of iteration {}", self.members.len(), iteration);

        record.insert("n_members", RecordValue::Scalar(self.members.len() as f32));
        Ok(record)
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        self.predict_first(x, self.members.len())
    }

    fn adapt(&mut self, iteration: usize) -> Result<()> {
        self.pending = Some(iteration);
        Ok(())
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(Self {
            factory: Rc::clone(&self.factory),
            members: vec![],
            pending: Some(0),
        })
    }
}
