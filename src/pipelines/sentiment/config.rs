use serde::{Deserialize, Serialize};

use burn::LearningRate;

use crate::models::lstm;

/// What to do with a batch whose sample count differs from the configured batch size.
///
/// The hidden state carried between batches is sized to the batch size, so a short tail batch
/// cannot be fed as is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaggedBatchPolicy {
    /// Consume the batch without contributing to the loss or accuracy totals, and without
    /// touching the parameters
    #[default]
    Skip,

    /// Pad the batch with `<pad>`-only sequences up to the batch size; only the real samples
    /// contribute to the loss and accuracy
    Pad,
}

/// How many improving checkpoints to keep on disk
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionPolicy {
    /// Never delete a checkpoint
    #[default]
    Unbounded,

    /// Keep the `n` most accurate checkpoints (the most recent, since saves only happen on
    /// improvement)
    KeepBest(usize),
}

/// Define configuration struct for the experiment
#[derive(burn::config::Config)]
pub struct Training {
    /// Number of epochs
    #[config(default = 30)]
    pub num_epochs: usize,

    /// Batch size
    #[config(default = 64)]
    pub batch_size: usize,

    /// Adam learning rate
    #[config(default = 1e-3)]
    pub learning_rate: LearningRate,

    /// Maximum number of vocabulary entries, specials excluded
    #[config(default = 15_000)]
    pub max_vocab_size: usize,

    /// Share of the labeled phrases used for training, the rest is used for validation
    #[config(default = 0.7)]
    pub split_ratio: f64,

    /// Seed for the train/validation split and the per-epoch batch shuffle
    #[config(default = 42)]
    pub seed: u64,

    /// Size of each word vector, must match the pretrained vectors
    #[config(default = 100)]
    pub embedding_size: usize,

    /// Size of the LSTM hidden state
    #[config(default = 100)]
    pub hidden_size: usize,

    /// Number of stacked LSTM layers
    #[config(default = 2)]
    pub num_layers: usize,

    /// Dropout between LSTM layers
    #[config(default = 0.0)]
    pub dropout: f64,

    /// Handling of batches smaller than the batch size
    #[config(default = "RaggedBatchPolicy::Skip")]
    pub ragged_batches: RaggedBatchPolicy,

    /// Checkpoint retention
    #[config(default = "RetentionPolicy::Unbounded")]
    pub retention: RetentionPolicy,
}

impl Training {
    /// The model configuration for a vocabulary and label set of the given sizes
    pub fn model_config(&self, vocab_size: usize, output_size: usize) -> lstm::Config {
        lstm::Config::new(vocab_size, output_size)
            .with_embedding_size(self.embedding_size)
            .with_hidden_size(self.hidden_size)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_the_reference_setup() {
        let config = Training::new();

        assert_eq!(config.num_epochs, 30);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.split_ratio, 0.7);
        assert_eq!(config.ragged_batches, RaggedBatchPolicy::Skip);
        assert_eq!(config.retention, RetentionPolicy::Unbounded);
    }

    #[test]
    fn model_config_carries_hyperparameters() {
        let model = Training::new()
            .with_hidden_size(32)
            .with_num_layers(3)
            .model_config(500, 5);

        assert_eq!(model.vocab_size, 500);
        assert_eq!(model.output_size, 5);
        assert_eq!(model.embedding_size, 100);
        assert_eq!(model.hidden_size, 32);
        assert_eq!(model.num_layers, 3);
    }
}
