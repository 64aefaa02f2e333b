/// Batcher
pub mod batcher;

/// Training configuration and batch/checkpoint policies
pub mod config;

/// Checkpoints on validation accuracy improvement
pub mod checkpoint;

/// Training and evaluation loops
pub mod training;

/// End-to-end training from the phrase file
pub mod pipeline;

/// Inference
pub mod inference;

pub use batcher::Batcher;
pub use checkpoint::{BestAccuracy, Checkpointer};
pub use config::{RaggedBatchPolicy, RetentionPolicy};
pub use inference::{infer, Prediction};
pub use pipeline::{train, Paths};
pub use training::{evaluate, learn, train_epoch, EpochStats, History};

/// Training Config
pub type Config = config::Training;
