//! Greedy evaluation of the action-value function over the discrete actions.
use crate::{
    error::FqiError, preprocess::StandardScaler, ActionRoute, ActionSet, Preprocessor, QRegressor,
};
use anyhow::Result;
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Evaluates the regressor on every action of the action set.
pub(super) struct GreedyEvaluator<'a> {
    pub preprocessor: &'a Preprocessor,
    pub regressor: &'a QRegressor,
    pub actions: &'a ActionSet,
    pub sa_scaler: Option<&'a StandardScaler>,
    pub batch_actions: bool,
}

impl GreedyEvaluator<'_> {
    /// Returns `[states, action k]` rows.
    fn state_action_rows(&self, states: ArrayView2<f32>, k: usize) -> Result<Array2<f32>> {
        let a = self.actions.get(k);
        let block = a
            .broadcast((states.nrows(), a.len()))
            .ok_or_else(|| FqiError::shape("cannot broadcast action over states"))?;
        Ok(concatenate(Axis(1), &[states.view(), block.view()])?)
    }

    fn predict(&self, x: ArrayView2<f32>, route: Option<ActionRoute>, n: usize) -> Result<Array1<f32>> {
        let x = self.preprocessor.transform_test(x, self.sa_scaler)?;
        let pred = self.regressor.predict(x.view(), route)?;
        if pred.len() != n {
            return Err(FqiError::shape(format!(
                "regressor returned {} predictions for {} rows",
                pred.len(),
                n
            ))
            .into());
        }
        Ok(pred)
    }

    /// Action values, one row per state and one column per action.
    ///
    /// Values of absorbing states are zero.
    pub fn q_values(
        &self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
        evaluation: bool,
    ) -> Result<Array2<f32>> {
        let n = states.nrows();
        let m = self.actions.len();
        let mut q = Array2::<f32>::zeros((n, m));

        match self.regressor {
            QRegressor::Simple(_) if self.batch_actions => {
                // Rows of action k are at k * n..(k + 1) * n
                let blocks = (0..m)
                    .map(|k| self.state_action_rows(states, k))
                    .collect::<Result<Vec<_>>>()?;
                let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
                let x = concatenate(Axis(0), &views)?;
                let pred = self.predict(x.view(), None, n * m)?;
                for k in 0..m {
                    q.column_mut(k).assign(&pred.slice(s![k * n..(k + 1) * n]));
                }
            }
            _ => {
                let routed = self.regressor.is_routed() && !evaluation;
                for k in 0..m {
                    let x = self.state_action_rows(states, k)?;
                    let route = match routed {
                        true => Some(ActionRoute { n_actions: m, idx: k }),
                        false => None,
                    };
                    let pred = self.predict(x.view(), route, n)?;
                    q.column_mut(k).assign(&pred);
                }
            }
        }

        // Absorbing states have no continuation value
        for (mut row, &a) in q.outer_iter_mut().zip(absorbing.iter()) {
            let w = 1.0 - a;
            row.mapv_inplace(|v| if w == 0.0 { 0.0 } else { v * w });
        }

        Ok(q)
    }

    /// The maximal action value of each state and the index of the
    /// maximizing action. Ties go to the lowest index.
    pub fn evaluate(
        &self,
        states: ArrayView2<f32>,
        absorbing: ArrayView1<f32>,
        evaluation: bool,
    ) -> Result<(Array1<f32>, Vec<usize>)> {
        let q = self.q_values(states, absorbing, evaluation)?;
        let mut max_q = Array1::<f32>::zeros(q.nrows());
        let mut argmax = Vec::with_capacity(q.nrows());

        for (i, row) in q.outer_iter().enumerate() {
            let mut best = 0;
            for k in 1..row.len() {
                if row[k] > row[best] {
                    best = k;
                }
            }
            max_q[i] = row[best];
            argmax.push(best);
        }

        Ok((max_q, argmax))
    }
}
