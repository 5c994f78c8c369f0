#![warn(missing_docs)]
//! Regressor combinators for [`fqi_core`].
//!
//! * [`ActionRegressor`] keeps a separate regressor for each discrete action
//!   and is used with [`QRegressor::routed`](fqi_core::QRegressor::routed).
//! * [`ResidualEnsemble`] adds a regressor per iteration, each fitted on the
//!   residual of the previous ones, and is used with
//!   [`QRegressor::simple`](fqi_core::QRegressor::simple).
mod action_regressor;
mod residual_ensemble;
pub use action_regressor::ActionRegressor;
pub use residual_ensemble::ResidualEnsemble;
