/// The model configuration
pub mod config;

/// Stacked LSTM sentiment classifier
pub mod model;

pub use config::Config;
pub use model::{HiddenState, Model, ModelRecord};
