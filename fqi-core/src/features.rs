//! Feature transforms selectable from configuration.
use crate::{error::FqiError, FeatureTransform};
use anyhow::Result;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Feature transforms available from [`FqiConfig`](crate::FqiConfig).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum FeaturesConfig {
    /// See [`PolynomialFeatures`].
    Polynomial {
        /// The maximal degree of the monomials.
        degree: usize,
    },
}

/// Builds the transform described by `config`.
pub fn select_features(
    config: Option<&FeaturesConfig>,
) -> Result<Option<Box<dyn FeatureTransform>>> {
    match config {
        None => Ok(None),
        Some(FeaturesConfig::Polynomial { degree }) => {
            if *degree == 0 {
                return Err(FqiError::config("polynomial degree must be positive").into());
            }
            Ok(Some(Box::new(PolynomialFeatures::new(*degree))))
        }
    }
}

/// All monomials of the input columns with degree `1..=degree`.
///
/// Columns are ordered by degree, then lexicographically by column index,
/// without a bias column. For inputs `[x0, x1]` and degree 2 the output is
/// `[x0, x1, x0^2, x0*x1, x1^2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFeatures {
    degree: usize,
}

impl PolynomialFeatures {
    /// Constructs the transform.
    pub fn new(degree: usize) -> Self {
        Self { degree }
    }

    /// Column indices multiplied together for each output column.
    fn monomials(&self, n_cols: usize) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut prefix = Vec::with_capacity(self.degree);
        for d in 1..=self.degree {
            push_monomials(0, n_cols, d, &mut prefix, &mut out);
        }
        out
    }

    fn transform(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let monomials = self.monomials(x.ncols());
        Array2::from_shape_fn((x.nrows(), monomials.len()), |(i, j)| {
            monomials[j].iter().map(|&c| x[[i, c]]).product()
        })
    }
}

fn push_monomials(
    start: usize,
    n_cols: usize,
    left: usize,
    prefix: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if left == 0 {
        out.push(prefix.clone());
        return;
    }
    for c in start..n_cols {
        prefix.push(c);
        push_monomials(c, n_cols, left - 1, prefix, out);
        prefix.pop();
    }
}

impl FeatureTransform for PolynomialFeatures {
    fn apply(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        Ok(self.transform(x))
    }

    fn apply_test(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        Ok(self.transform(x))
    }

    fn box_clone(&self) -> Box<dyn FeatureTransform> {
        Box::new(self.clone())
    }
}
