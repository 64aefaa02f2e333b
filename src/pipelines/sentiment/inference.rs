use std::{path::Path, sync::Arc};

use burn::{
    config::Config as _,
    data::dataloader::batcher::Batcher as _,
    module::Module,
    record::{DefaultRecorder, Recorder},
    tensor::backend::Backend,
};
use serde::Serialize;

use crate::{models::lstm, text::Vocabularies};

use super::{
    checkpoint::checkpoint_stem,
    pipeline::{MODEL_CONFIG_FILE, VOCAB_FILE},
    Batcher,
};

/// The most likely sentiment for a phrase
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    /// The phrase as given
    pub phrase: String,

    /// The predicted sentiment label
    pub label: String,

    /// Probability of the predicted label
    pub probability: f64,
}

/// Predict the sentiment of each phrase with a saved checkpoint.
///
/// A relative `checkpoint` is resolved against `model_dir`. The recorder extension is optional.
pub async fn infer<B: Backend>(
    device: B::Device,                 // Device on which to perform computation
    model_dir: impl AsRef<Path>,       // Directory containing the config, vocabularies and checkpoints
    checkpoint: impl AsRef<Path>,      // The checkpoint to load
    samples: Vec<String>,              // Phrases to classify
) -> anyhow::Result<Vec<Prediction>> {
    let model_dir = model_dir.as_ref();

    // Load the model configuration and vocabularies saved by training
    let config = lstm::Config::load(model_dir.join(MODEL_CONFIG_FILE))
        .map_err(|e| anyhow!("Unable to load model config file: {}", e))?;

    let vocab = Vocabularies::load(model_dir.join(VOCAB_FILE))
        .await
        .map_err(|e| anyhow!("Unable to load vocabularies: {}", e))?;

    if samples.is_empty() {
        return Ok(Vec::new());
    }

    log::info!("Loading weights...");

    let record = DefaultRecorder::new()
        .load(checkpoint_stem(model_dir.join(checkpoint)), &device)
        .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

    let model = config.init::<B>(&device).load_record(record);

    log::info!("Running inference...");

    let batcher = Batcher::<B>::new(Arc::new(vocab.tokens), device);
    let probabilities = model.infer(batcher.batch(samples.clone()));

    let [_, n_classes] = probabilities.dims();
    let values = probabilities.into_data().convert::<f32>().value;

    samples
        .into_iter()
        .zip(values.chunks(n_classes))
        .map(|(phrase, row)| {
            let (class_id, probability) = row
                .iter()
                .copied()
                .enumerate()
                .fold((0, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });

            let label = vocab
                .labels
                .label(class_id)
                .ok_or_else(|| anyhow!("No label for class {}", class_id))?;

            Ok(Prediction {
                phrase,
                label: label.to_string(),
                probability: probability as f64,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, config::Config as _};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        pipelines::sentiment::{checkpoint::Checkpointer, RetentionPolicy},
        text::{tokenize, LabelVocab, Vocab},
    };

    type B = NdArray;

    async fn saved_model(dir: &Path) -> std::path::PathBuf {
        let vocab = Vocabularies {
            tokens: Vocab::build(&[tokenize("a gorgeous dull film")], 100),
            labels: LabelVocab::build(["0", "1", "2", "3", "4"]),
        };
        vocab.save(dir.join(VOCAB_FILE)).await.unwrap();

        let config = lstm::Config::new(vocab.tokens.len(), 5)
            .with_embedding_size(4)
            .with_hidden_size(3);
        config.save(dir.join(MODEL_CONFIG_FILE)).unwrap();

        let model = config.init::<B>(&Default::default());
        let mut checkpointer = Checkpointer::new(dir, RetentionPolicy::Unbounded).unwrap();

        checkpointer.observe::<B, _>(&model, 1, 0.5).unwrap().unwrap()
    }

    #[tokio::test]
    async fn predicts_one_label_per_phrase() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = saved_model(dir.path()).await;
        let name = checkpoint.file_name().unwrap().to_owned();

        let predictions = infer::<B>(
            Default::default(),
            dir.path(),
            name,
            vec!["a gorgeous film".to_string(), "dull".to_string(), "".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[1].phrase, "dull");
        for prediction in predictions {
            assert!(["0", "1", "2", "3", "4"].contains(&prediction.label.as_str()));
            assert!(prediction.probability > 0.19 && prediction.probability <= 1.0);
        }
    }

    #[tokio::test]
    async fn missing_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        saved_model(dir.path()).await;

        let result = infer::<B>(
            Default::default(),
            dir.path(),
            "sentiment-estimator-e9-0",
            vec!["film".to_string()],
        )
        .await;

        assert!(result.is_err());
    }
}
