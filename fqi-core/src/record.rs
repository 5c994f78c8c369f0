//! Types and traits for recording values computed during fitted Q-iteration.
//!
//! Every call of [`Fqi::fit`] and [`Fqi::partial_fit`] returns a [`Record`]
//! holding the iteration number and statistics of the regression targets,
//! merged with whatever the regressor reports from its own `fit`.
//! [`Trainer`] forwards these records to a [`Recorder`].
//!
//! ```rust
//! use fqi_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("iteration", 1.0);
//! record.insert("target_mean", RecordValue::Scalar(0.5));
//! record.insert("targets", RecordValue::Array1(vec![1.0, 0.0]));
//! assert_eq!(record.get_scalar("target_mean").unwrap(), 0.5);
//! ```
//!
//! [`Fqi::fit`]: crate::Fqi::fit
//! [`Fqi::partial_fit`]: crate::Fqi::partial_fit
//! [`Trainer`]: crate::Trainer
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
