use crate::error::FqiError;
use anyhow::Result;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Per-column standardization `(x - mean) / scale`.
///
/// `scale` is the population standard deviation of the column, or 1 for
/// constant columns.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StandardScaler {
    mean: Array1<f32>,
    scale: Array1<f32>,
}

impl StandardScaler {
    /// Estimates mean and scale of each column of `x`.
    pub fn fit(x: ArrayView2<f32>) -> Result<Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| FqiError::shape("cannot fit a scaler on zero rows"))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });
        Ok(Self { mean, scale })
    }

    /// Estimates the statistics of a single column.
    pub fn fit1(y: ArrayView1<f32>) -> Result<Self> {
        Self::fit(y.insert_axis(Axis(1)))
    }

    /// Standardizes the columns of `x`.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_cols(x.ncols())?;
        Ok((&x - &self.mean) / &self.scale)
    }

    /// Standardizes a single column.
    pub fn transform1(&self, y: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check_cols(1)?;
        let (m, s) = (self.mean[0], self.scale[0]);
        Ok(y.mapv(|v| (v - m) / s))
    }

    /// Maps standardized columns back to the original units.
    pub fn inverse_transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_cols(x.ncols())?;
        Ok(&x * &self.scale + &self.mean)
    }

    /// Column means.
    pub fn mean(&self) -> ArrayView1<f32> {
        self.mean.view()
    }

    /// Column scales.
    pub fn scale(&self) -> ArrayView1<f32> {
        self.scale.view()
    }

    fn check_cols(&self, n_cols: usize) -> Result<()> {
        if n_cols != self.mean.len() {
            return Err(FqiError::shape(format!(
                "scaler was fitted on {} columns, got {}",
                self.mean.len(),
                n_cols
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, aview1};

    #[test]
    fn test_standardize() -> Result<()> {
        let x = array![[1.0f32, 5.0], [3.0, 5.0]];
        let scaler = StandardScaler::fit(x.view())?;
        assert_eq!(scaler.mean(), aview1(&[2.0f32, 5.0]));
        // Constant column keeps unit scale
        assert_eq!(scaler.scale(), aview1(&[1.0f32, 1.0]));

        let z = scaler.transform(x.view())?;
        assert_eq!(z, array![[-1.0f32, 0.0], [1.0, 0.0]]);
        assert_eq!(scaler.inverse_transform(z.view())?, x);
        Ok(())
    }

    #[test]
    fn test_single_column() -> Result<()> {
        let r = array![1.0f32, 0.0, -1.0];
        let scaler = StandardScaler::fit1(r.view())?;
        let z = scaler.transform1(r.view())?;
        assert!(z.sum().abs() < 1e-6);
        assert!((z[0] - 1.224_744_9).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_column_mismatch() -> Result<()> {
        let scaler = StandardScaler::fit(array![[1.0f32, 2.0]].view())?;
        let err = scaler.transform(array![[1.0f32]].view()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FqiError>(),
            Some(FqiError::ShapeError(_))
        ));
        Ok(())
    }
}
