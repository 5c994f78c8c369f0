//! Fitted Q-iteration.
mod base;
mod config;
mod explorer;
mod greedy;
pub use base::Fqi;
pub use config::FqiConfig;
pub use explorer::{EpsilonGreedy, ExploringPolicy, FqiExplorer};
