use std::{ffi::OsString, path::PathBuf};

use burn::LearningRate;
use pico_args::Arguments;

use crate::{
    pipelines::sentiment::{Config, Paths, RaggedBatchPolicy, RetentionPolicy},
    text::vectors::DEFAULT_VECTORS,
};

/// Environment variable naming the output data directory
pub static OUTPUT_DATA_DIR_VAR: &str = "SM_OUTPUT_DATA_DIR";

/// Environment variable naming the model directory
pub static MODEL_DIR_VAR: &str = "SM_MODEL_DIR";

/// Environment variable naming the training channel
pub static TRAIN_CHANNEL_VAR: &str = "SM_CHANNEL_TRAIN";

/// Environment variable naming the test channel
pub static TEST_CHANNEL_VAR: &str = "SM_CHANNEL_TEST";

/// Settings Error
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required path was given neither as a flag nor through the environment
    #[error("missing {flag} (or the {var} environment variable)")]
    Missing {
        /// The command line flag
        flag: &'static str,
        /// The environment variable consulted as a fallback
        var: &'static str,
    },

    /// A flag could not be parsed
    #[error("invalid arguments: {0}")]
    Args(#[from] pico_args::Error),
}

/// Training settings resolved from command line flags and the environment
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Number of epochs
    pub epochs: usize,

    /// Batch size
    pub batch_size: usize,

    /// Adam learning rate
    pub learning_rate: LearningRate,

    /// Train on the first CUDA device if one is available
    pub use_cuda: bool,

    /// Input and artifact locations
    pub paths: Paths,

    /// The test channel (recognized, not consumed by training)
    pub test: PathBuf,

    /// Keep only this many checkpoints
    pub keep_best: Option<usize>,

    /// Pad short batches instead of skipping them
    pub pad_ragged: bool,
}

impl Settings {
    /// Resolve settings from the given arguments, falling back to the process environment
    pub fn parse(pargs: Arguments) -> Result<Self, ConfigError> {
        Self::parse_with(pargs, |var| std::env::var_os(var))
    }

    /// Resolve settings from the given arguments, falling back to the `env` lookup
    pub fn parse_with<F>(mut pargs: Arguments, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let defaults = Config::new();

        let path = |pargs: &mut Arguments,
                    flag: &'static str,
                    var: &'static str|
         -> Result<PathBuf, ConfigError> {
            let value: Option<PathBuf> = pargs.opt_value_from_os_str(flag, parse_path)?;

            value
                .or_else(|| env(var).map(PathBuf::from))
                .ok_or(ConfigError::Missing { flag, var })
        };

        let settings = Settings {
            epochs: pargs
                .opt_value_from_str("--epochs")?
                .unwrap_or(defaults.num_epochs),
            batch_size: pargs
                .opt_value_from_str("--batch-size")?
                .unwrap_or(defaults.batch_size),
            learning_rate: pargs
                .opt_value_from_str("--learning-rate")?
                .unwrap_or(defaults.learning_rate),
            use_cuda: pargs
                .opt_value_from_fn("--use-cuda", parse_bool)?
                .unwrap_or(true),
            keep_best: pargs.opt_value_from_str("--keep-best")?,
            pad_ragged: pargs.contains("--pad-ragged"),
            paths: Paths {
                vectors: pargs
                    .opt_value_from_os_str("--vectors", parse_path)?
                    .unwrap_or_else(|| PathBuf::from(".vector_cache").join(DEFAULT_VECTORS)),
                output_data_dir: path(&mut pargs, "--output-data-dir", OUTPUT_DATA_DIR_VAR)?,
                model_dir: path(&mut pargs, "--model-dir", MODEL_DIR_VAR)?,
                train: path(&mut pargs, "--train", TRAIN_CHANNEL_VAR)?,
            },
            test: path(&mut pargs, "--test", TEST_CHANNEL_VAR)?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            log::warn!("Ignoring unrecognized arguments: {:?}", remaining);
        }

        Ok(settings)
    }

    /// The training configuration these settings describe
    pub fn training_config(&self) -> Config {
        Config::new()
            .with_num_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_learning_rate(self.learning_rate)
            .with_ragged_batches(if self.pad_ragged {
                RaggedBatchPolicy::Pad
            } else {
                RaggedBatchPolicy::Skip
            })
            .with_retention(match self.keep_best {
                Some(n) => RetentionPolicy::KeepBest(n),
                None => RetentionPolicy::Unbounded,
            })
    }
}

fn parse_path(value: &std::ffi::OsStr) -> Result<PathBuf, &'static str> {
    Ok(PathBuf::from(value))
}

/// Accepts `true`/`false` in any case, as well as `1`/`0`
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("expected true or false, found {value:?}")),
    }
}
