//! This module is used for tests.
use crate::{error::FqiError, record::Record, FitOptions, Regressor};
use anyhow::{anyhow, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::{cell::Cell, rc::Rc};

/// Regressor returning the mean target of the training rows equal to the
/// queried row, and 0 for rows not seen in training.
#[derive(Debug, Clone, Default)]
pub struct LookupRegressor {
    table: Vec<(Vec<f32>, f32, usize)>,
}

impl LookupRegressor {
    /// Constructs an empty regressor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of distinct training rows.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` before the first fit.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn lookup(&self, row: ArrayView1<f32>) -> f32 {
        self.table
            .iter()
            .find(|(k, _, _)| row.iter().eq(k.iter()))
            .map(|(_, sum, n)| sum / *n as f32)
            .unwrap_or(0.0)
    }
}

impl Regressor for LookupRegressor {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, _opts: &FitOptions) -> Result<Record> {
        self.table.clear();
        for (row, &t) in x.outer_iter().zip(y.iter()) {
            match self.table.iter_mut().find(|(k, _, _)| row.iter().eq(k.iter())) {
                Some((_, sum, n)) => {
                    *sum += t;
                    *n += 1;
                }
                None => self.table.push((row.to_vec(), t, 1)),
            }
        }
        Ok(Record::from_scalar("n_keys", self.table.len() as f32))
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        Ok(x.outer_iter().map(|row| self.lookup(row)).collect())
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(Self::new())
    }
}

/// Regressor computing a fixed function of each row. Fitting does nothing.
pub struct FnRegressor {
    f: Rc<dyn Fn(ArrayView1<f32>) -> f32>,
    n_fits: usize,
}

impl FnRegressor {
    /// Constructs the regressor.
    pub fn new(f: impl Fn(ArrayView1<f32>) -> f32 + 'static) -> Self {
        Self {
            f: Rc::new(f),
            n_fits: 0,
        }
    }

    /// The number of calls of [`Regressor::fit`].
    pub fn n_fits(&self) -> usize {
        self.n_fits
    }
}

impl Regressor for FnRegressor {
    fn fit(&mut self, _x: ArrayView2<f32>, _y: ArrayView1<f32>, _opts: &FitOptions) -> Result<Record> {
        self.n_fits += 1;
        Ok(Record::empty())
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        Ok(x.outer_iter().map(|row| (self.f)(row)).collect())
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(Self {
            f: Rc::clone(&self.f),
            n_fits: 0,
        })
    }
}

/// [`LookupRegressor`] whose `fit` fails while its switch is on.
///
/// Predicting before the first successful fit is an error. Regressors made
/// by [`Regressor::fresh`] share the switch.
#[derive(Debug, Clone, Default)]
pub struct FailingRegressor {
    inner: LookupRegressor,
    fitted: bool,
    switch: Rc<Cell<bool>>,
}

impl FailingRegressor {
    /// Constructs a regressor whose fit succeeds until the switch is turned on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a regressor controlled by an existing switch.
    pub fn with_switch(switch: Rc<Cell<bool>>) -> Self {
        Self {
            switch,
            ..Self::default()
        }
    }

    /// The switch; `fit` fails while it holds `true`.
    pub fn switch(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.switch)
    }
}

impl Regressor for FailingRegressor {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, opts: &FitOptions) -> Result<Record> {
        if self.switch.get() {
            return Err(anyhow!("fit failed on {} rows", x.nrows()));
        }
        let record = self.inner.fit(x, y, opts)?;
        self.fitted = true;
        Ok(record)
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        match self.fitted {
            true => self.inner.predict(x),
            false => Err(FqiError::not_fitted("lookup table is empty").into()),
        }
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(Self::with_switch(self.switch()))
    }
}
