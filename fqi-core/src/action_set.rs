//! Discrete action set.
use crate::error::FqiError;
use anyhow::Result;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Caller-supplied specification of the discrete actions.
///
/// In YAML, a flat list (`[-1.0, 1.0]`) and a table
/// (`[[0.0, 1.0], [1.0, 0.0]]`) are both accepted.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum ActionSpec {
    /// Actions laid out one after another, `action_dim` values each.
    Flat(Vec<f32>),

    /// One row per action.
    Table(Vec<Vec<f32>>),
}

impl Default for ActionSpec {
    fn default() -> Self {
        Self::Flat(vec![])
    }
}

impl From<Vec<f32>> for ActionSpec {
    fn from(v: Vec<f32>) -> Self {
        Self::Flat(v)
    }
}

impl From<Vec<Vec<f32>>> for ActionSpec {
    fn from(v: Vec<Vec<f32>>) -> Self {
        Self::Table(v)
    }
}

/// Ordered collection of distinct actions, stored as an `(n_actions, action_dim)` table.
///
/// It holds at least two actions.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSet {
    actions: Array2<f32>,
}

impl ActionSet {
    /// Validates `spec` and builds the action table.
    ///
    /// Duplicated actions are dropped, keeping the first occurrence.
    /// With `action_dim == 1`, a table with a single row or a single column
    /// is read as a list of scalar actions.
    ///
    /// # Errors
    ///
    /// [`FqiError::ConfigError`] if `action_dim` is zero, the shape of `spec`
    /// disagrees with `action_dim`, an entry is not finite, or fewer than two
    /// distinct actions remain.
    pub fn new(spec: &ActionSpec, action_dim: usize) -> Result<Self> {
        if action_dim == 0 {
            return Err(FqiError::config("action_dim must be positive").into());
        }

        let rows: Vec<Vec<f32>> = match spec {
            ActionSpec::Flat(v) => {
                if v.len() % action_dim != 0 {
                    return Err(FqiError::config(format!(
                        "{} values cannot be split into actions of dimension {}",
                        v.len(),
                        action_dim
                    ))
                    .into());
                }
                v.chunks(action_dim).map(|c| c.to_vec()).collect()
            }
            ActionSpec::Table(t) if action_dim == 1 => {
                let single_row = t.len() == 1;
                let single_col = t.iter().all(|r| r.len() == 1);
                if !single_row && !single_col {
                    return Err(FqiError::config(
                        "a table of scalar actions must have a single row or a single column",
                    )
                    .into());
                }
                t.iter().flatten().map(|a| vec![*a]).collect()
            }
            ActionSpec::Table(t) => {
                if let Some(r) = t.iter().find(|r| r.len() != action_dim) {
                    return Err(FqiError::config(format!(
                        "action {:?} does not have dimension {}",
                        r, action_dim
                    ))
                    .into());
                }
                t.clone()
            }
        };

        if rows.iter().flatten().any(|a| !a.is_finite()) {
            return Err(FqiError::config("actions must be finite").into());
        }

        let mut distinct: Vec<Vec<f32>> = Vec::with_capacity(rows.len());
        for r in rows {
            if !distinct.contains(&r) {
                distinct.push(r);
            }
        }

        if distinct.len() < 2 {
            return Err(FqiError::config(format!(
                "at least two distinct actions are required, got {}",
                distinct.len()
            ))
            .into());
        }

        let n_actions = distinct.len();
        let actions = Array2::from_shape_vec(
            (n_actions, action_dim),
            distinct.into_iter().flatten().collect(),
        )?;

        Ok(Self { actions })
    }

    /// The number of actions.
    pub fn len(&self) -> usize {
        self.actions.nrows()
    }

    /// Always `false`, an action set holds at least two actions.
    pub fn is_empty(&self) -> bool {
        self.actions.nrows() == 0
    }

    /// Dimension of each action.
    pub fn action_dim(&self) -> usize {
        self.actions.ncols()
    }

    /// Returns the action at index `ix`.
    ///
    /// Panics if `ix >= self.len()`.
    pub fn get(&self, ix: usize) -> ArrayView1<f32> {
        self.actions.row(ix)
    }

    /// The whole `(n_actions, action_dim)` table.
    pub fn as_array(&self) -> ArrayView2<f32> {
        self.actions.view()
    }

    /// Returns the index of the action exactly equal to `a`, if any.
    pub fn index_of(&self, a: ArrayView1<f32>) -> Option<usize> {
        self.actions.outer_iter().position(|row| row == a)
    }
}
