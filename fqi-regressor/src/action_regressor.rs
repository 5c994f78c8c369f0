//! One regressor per discrete action.
use anyhow::Result;
use fqi_core::{
    record::Record, ActionRoute, FitOptions, FqiError, Regressor, RoutedRegressor,
};
use log::{debug, warn};
use ndarray::{s, Array1, ArrayView1, ArrayView2, Axis};
use std::rc::Rc;

struct Member {
    regressor: Box<dyn Regressor>,

    /// Trailing `action_dim` columns of the training rows, `None` if the
    /// member received no rows.
    key: Option<Vec<f32>>,
}

impl Member {
    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        match self.key {
            Some(_) => self.regressor.predict(x),
            None => Ok(Array1::zeros(x.nrows())),
        }
    }
}

/// Action-value function with a separate regressor for each action.
///
/// Member `k` is trained on the rows whose action has index `k` in the
/// action set. Members are rebuilt by the factory on every fit and replace
/// the previous ones only if every member fit succeeds.
///
/// Without a route, each row is sent to the member whose training rows
/// ended with the same `action_dim` values. This requires the action
/// columns to reach the regressor unchanged at the end of the row, which
/// does not hold with feature transforms.
pub struct ActionRegressor {
    action_dim: usize,
    factory: Rc<dyn Fn() -> Box<dyn Regressor>>,
    members: Vec<Member>,
}

impl ActionRegressor {
    /// Constructs the regressor.
    ///
    /// * `action_dim` - the number of trailing action columns of a row.
    /// * `factory` - builds an untrained member.
    pub fn new<R, F>(action_dim: usize, factory: F) -> Self
    where
        R: Regressor + 'static,
        F: Fn() -> R + 'static,
    {
        Self {
            action_dim,
            factory: Rc::new(move || Box::new(factory()) as Box<dyn Regressor>),
            members: vec![],
        }
    }

    /// The number of members, 0 before the first fit.
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    fn action_key<'a>(&self, row: ArrayView1<'a, f32>) -> ArrayView1<'a, f32> {
        let n = row.len();
        row.slice_move(s![n - self.action_dim..])
    }

    fn check_width(&self, x: ArrayView2<f32>) -> Result<()> {
        if x.ncols() < self.action_dim {
            return Err(FqiError::shape(format!(
                "rows of {} columns cannot hold actions of dimension {}",
                x.ncols(),
                self.action_dim
            ))
            .into());
        }
        Ok(())
    }

    fn check_fitted(&self) -> Result<()> {
        match self.members.is_empty() {
            true => Err(FqiError::not_fitted("action regressor has not been fitted").into()),
            false => Ok(()),
        }
    }

    /// Member index of each row, by its trailing action columns.
    fn route_rows(&self, x: ArrayView2<f32>) -> Result<Vec<usize>> {
        self.check_width(x)?;
        let member_of_row = x
            .outer_iter()
            .enumerate()
            .map(|(i, row)| {
                let a = self.action_key(row);
                self.members
                    .iter()
                    .position(|m| match &m.key {
                        Some(key) => a.iter().eq(key.iter()),
                        None => false,
                    })
                    .ok_or_else(|| {
                        FqiError::shape(format!("row {} has no member for action {}", i, a))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(member_of_row)
    }
}

impl RoutedRegressor for ActionRegressor {
    fn fit(
        &mut self,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        action_ix: &[usize],
        n_actions: usize,
        opts: &FitOptions,
    ) -> Result<Record> {
        if action_ix.len() != x.nrows() || y.len() != x.nrows() {
            return Err(FqiError::shape(format!(
                "{} rows, {} targets and {} action indices",
                x.nrows(),
                y.len(),
                action_ix.len()
            ))
            .into());
        }
        self.check_width(x)?;
        if let Some(&ix) = action_ix.iter().find(|&&ix| ix >= n_actions) {
            return Err(
                FqiError::shape(format!("action index {} out of {} actions", ix, n_actions)).into(),
            );
        }

        let mut members = Vec::with_capacity(n_actions);
        let mut record = Record::empty();

        for k in 0..n_actions {
            let rows: Vec<usize> = (0..x.nrows()).filter(|&i| action_ix[i] == k).collect();
            let mut regressor = (self.factory)();

            let key = match rows.first() {
                None => {
                    warn!("No training rows for action {}, its values are set to 0", k);
                    None
                }
                Some(&first) => {
                    let xs = x.select(Axis(0), &rows);
                    let ys = y.select(Axis(0), &rows);
                    let r = regressor.fit(xs.view(), ys.view(), opts)?;
                    for (name, value) in r.into_iter_in_record() {
                        record.insert(format!("action_{}/{}", k, name), value);
                    }
                    debug!("Fitted member {} on {} rows", k, rows.len());
                    Some(self.action_key(x.row(first)).to_vec())
                }
            };
            members.push(Member { regressor, key });
        }

        self.members = members;
        Ok(record)
    }

    fn predict(&self, x: ArrayView2<f32>, route: Option<ActionRoute>) -> Result<Array1<f32>> {
        self.check_fitted()?;

        match route {
            Some(route) => {
                if route.n_actions != self.members.len() || route.idx >= route.n_actions {
                    return Err(FqiError::shape(format!(
                        "route to member {} of {}, but {} members are fitted",
                        route.idx,
                        route.n_actions,
                        self.members.len()
                    ))
                    .into());
                }
                self.members[route.idx].predict(x)
            }
            None => {
                let member_of_row = self.route_rows(x)?;
                let mut out = Array1::<f32>::zeros(x.nrows());
                for (k, member) in self.members.iter().enumerate() {
                    let rows: Vec<usize> = (0..x.nrows()).filter(|&i| member_of_row[i] == k).collect();
                    if rows.is_empty() {
                        continue;
                    }
                    let pred = member.predict(x.select(Axis(0), &rows).view())?;
                    for (&i, &v) in rows.iter().zip(pred.iter()) {
                        out[i] = v;
                    }
                }
                Ok(out)
            }
        }
    }

    fn fresh(&self) -> Box<dyn RoutedRegressor> {
        Box::new(Self {
            action_dim: self.action_dim,
            factory: Rc::clone(&self.factory),
            members: vec![],
        })
    }
}
