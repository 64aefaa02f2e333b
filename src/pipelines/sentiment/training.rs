use std::sync::Arc;

use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion,
    },
    train::ClassificationOutput,
    LearningRate,
};
use serde::{Deserialize, Serialize};

use crate::models::lstm::{HiddenState, Model};

use super::{batcher::Train, checkpoint::Checkpointer, config::RaggedBatchPolicy, Config};

/// Mean loss and accuracy over one pass of a split
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// Mean loss per batch
    pub loss: f64,

    /// Share of correctly classified samples
    pub accuracy: f64,
}

/// Per-epoch statistics for both splits
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    /// Training split, one entry per epoch
    pub train: Vec<EpochStats>,

    /// Validation split, one entry per epoch
    pub valid: Vec<EpochStats>,

    /// The best validation accuracy reached
    pub best_accuracy: f64,
}

/// How batches are fed through a loop
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopSettings {
    /// The configured batch size; the carried hidden state is sized to it
    pub batch_size: usize,

    /// Handling of batches of any other size
    pub ragged_batches: RaggedBatchPolicy,
}

impl From<&Config> for LoopSettings {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            ragged_batches: config.ragged_batches,
        }
    }
}

impl LoopSettings {
    /// The batch to feed the model, or `None` when the batch is to be skipped
    fn admit<B: Backend>(&self, batch: Train<B>) -> Option<Train<B>> {
        let size = batch.input.batch_size();

        match self.ragged_batches {
            _ if size == self.batch_size => Some(batch),
            RaggedBatchPolicy::Pad if size > 0 && size < self.batch_size => {
                Some(batch.pad_to(self.batch_size))
            }
            _ => {
                log::debug!("Skipping batch of {} samples", size);
                None
            }
        }
    }
}

/// Running loss and accuracy totals
#[derive(Debug, Default)]
struct Totals {
    batches: usize,
    samples: usize,
    loss: f64,
    correct: usize,
}

impl Totals {
    fn record<B: Backend>(&mut self, output: &ClassificationOutput<B>) {
        self.loss += output.loss.clone().into_scalar().elem::<f64>();
        self.correct += count_correct(output);
        self.samples += output.targets.dims()[0];
    }

    fn stats(&self, settings: &LoopSettings) -> EpochStats {
        if self.batches == 0 {
            return EpochStats::default();
        }

        // Skipped batches still count towards the denominators
        let seen = match settings.ragged_batches {
            RaggedBatchPolicy::Skip => self.batches * settings.batch_size,
            RaggedBatchPolicy::Pad => self.samples,
        };

        EpochStats {
            loss: self.loss / self.batches as f64,
            accuracy: if seen == 0 {
                0.0
            } else {
                self.correct as f64 / seen as f64
            },
        }
    }
}

/// The number of samples whose highest logit is the target class
pub fn count_correct<B: Backend>(output: &ClassificationOutput<B>) -> usize {
    let [n_samples] = output.targets.dims();

    let correct = output
        .output
        .clone()
        .argmax(1)
        .reshape([n_samples])
        .equal(output.targets.clone())
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();

    correct as usize
}

/// Train for one epoch, returning the updated model and the epoch statistics.
///
/// The hidden state produced by each batch feeds the next one and is detached after every
/// optimizer step, so backpropagation never reaches past the current batch.
pub fn train_epoch<B, O, I>(
    mut model: Model<B>,
    batches: I,
    loss: &CrossEntropyLoss<B>,
    optim: &mut O,
    learning_rate: LearningRate,
    settings: &LoopSettings,
) -> (Model<B>, EpochStats)
where
    B: AutodiffBackend,
    O: Optimizer<Model<B>, B>,
    I: IntoIterator<Item = Train<B>>,
{
    let mut totals = Totals::default();
    let mut state: Option<HiddenState<B>> = None;

    for batch in batches {
        totals.batches += 1;

        let Some(batch) = settings.admit(batch) else {
            continue;
        };

        let (output, next) = model.forward_classification(batch, state, loss);
        totals.record(&output);

        // Gradients are produced fresh by each backward pass, nothing accumulates across steps
        let grads = output.loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(learning_rate, model, grads);

        state = Some(next.detach());
    }

    (model, totals.stats(settings))
}

/// Evaluate without updating the parameters.
///
/// Pass the inference-mode model (`model.valid()`), which runs without gradient tracking and
/// with dropout disabled.
pub fn evaluate<B, I>(
    model: &Model<B>,
    batches: I,
    loss: &CrossEntropyLoss<B>,
    settings: &LoopSettings,
) -> EpochStats
where
    B: Backend,
    I: IntoIterator<Item = Train<B>>,
{
    let mut totals = Totals::default();
    let mut state: Option<HiddenState<B>> = None;

    for batch in batches {
        totals.batches += 1;

        let Some(batch) = settings.admit(batch) else {
            continue;
        };

        let (output, next) = model.forward_classification(batch, state, loss);
        totals.record(&output);

        state = Some(next);
    }

    totals.stats(settings)
}

/// Train for the configured number of epochs, evaluating and checkpointing after each one
pub fn learn<B: AutodiffBackend>(
    mut model: Model<B>,
    dataloader_train: Arc<dyn DataLoader<Train<B>>>,
    dataloader_valid: Arc<dyn DataLoader<Train<B::InnerBackend>>>,
    config: &Config,
    checkpointer: &mut Checkpointer,
    device: &B::Device,
) -> anyhow::Result<(Model<B>, History)> {
    let settings = LoopSettings::from(config);
    let mut history = History::default();

    let loss_train = CrossEntropyLossConfig::new().init::<B>(device);
    let loss_valid = CrossEntropyLossConfig::new().init::<B::InnerBackend>(device);

    // Frozen parameters produce no gradients, so Adam only ever updates trainable ones
    let mut optim = AdamConfig::new().init();

    for epoch in 1..=config.num_epochs {
        log::info!("EPOCH {} of {}", epoch, config.num_epochs);

        let (trained, train_stats) = train_epoch(
            model,
            dataloader_train.iter(),
            &loss_train,
            &mut optim,
            config.learning_rate,
            &settings,
        );
        model = trained;
        log::info!(
            "  Training loss {}   acc {}",
            train_stats.loss,
            train_stats.accuracy
        );

        let valid_stats = evaluate(
            &model.valid(),
            dataloader_valid.iter(),
            &loss_valid,
            &settings,
        );
        log::info!(
            "  Validation loss {}   acc {}",
            valid_stats.loss,
            valid_stats.accuracy
        );

        history.train.push(train_stats);
        history.valid.push(valid_stats);

        checkpointer.observe::<B, _>(&model, epoch, valid_stats.accuracy)?;
    }

    history.best_accuracy = checkpointer.best_accuracy();

    log::info!("DONE");
    log::info!("Best accuracy: {}", history.best_accuracy);

    Ok((model, history))
}
