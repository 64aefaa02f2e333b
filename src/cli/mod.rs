/// Command line and environment settings
pub mod settings;

/// Compute device selection
pub mod device;

pub use settings::{parse_bool, ConfigError, Settings};
