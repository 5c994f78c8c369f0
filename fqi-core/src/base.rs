//! Capabilities consumed and exposed by the FQI engine.
mod features;
mod policy;
mod regressor;
pub use features::FeatureTransform;
pub use policy::Policy;
pub use regressor::{ActionRoute, FitOptions, QRegressor, Regressor, RoutedRegressor};
