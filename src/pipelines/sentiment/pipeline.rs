use std::{path::PathBuf, sync::Arc};

use burn::{
    config::Config as _,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset as _},
    module::Module,
    tensor::backend::AutodiffBackend,
};

use crate::{
    datasets::{phrases::TRAIN_FILE, Dataset},
    text::PretrainedVectors,
};

use super::{checkpoint::Checkpointer, learn, Batcher, Config, History};

/// File name of the persisted vocabularies, next to the checkpoints
pub static VOCAB_FILE: &str = "vocab.json";

/// File name of the persisted model configuration, next to the checkpoints
pub static MODEL_CONFIG_FILE: &str = "config.json";

/// File name of the training history in the output data directory
pub static HISTORY_FILE: &str = "history.json";

/// File name of the training configuration in the output data directory
pub static TRAINING_CONFIG_FILE: &str = "training.json";

/// Where training reads its inputs and writes its artifacts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paths {
    /// Directory holding the phrase file
    pub train: PathBuf,

    /// GloVe-formatted pretrained vectors file
    pub vectors: PathBuf,

    /// Directory receiving checkpoints, the vocabularies and the model config
    pub model_dir: PathBuf,

    /// Directory receiving the training history
    pub output_data_dir: PathBuf,
}

/// Train a sentiment classifier from the phrase file, returning the per-epoch history
pub async fn train<B: AutodiffBackend>(
    device: B::Device, // Device on which to perform computation (e.g., CPU or CUDA device)
    paths: &Paths,     // Input and artifact locations
    config: Config,    // Experiment configuration
) -> anyhow::Result<History> {
    log::info!("Preparing data...");

    let dataset = Dataset::load(paths.train.join(TRAIN_FILE)).await?;
    let (dataset_train, dataset_valid) = dataset.split(config.split_ratio, config.seed);

    let vocab = dataset_train.vocabularies(config.max_vocab_size);

    if vocab.labels.is_empty() {
        return Err(anyhow!("No labeled phrases in the training split"));
    }

    log::info!(
        "{} training and {} validation phrases, {} tokens, {} labels",
        dataset_train.len(),
        dataset_valid.len(),
        vocab.tokens.len(),
        vocab.labels.len()
    );

    let vectors = PretrainedVectors::load(&paths.vectors, &vocab.tokens, config.embedding_size).await?;

    let records_train = dataset_train.encode(&vocab)?;
    let records_valid = dataset_valid.encode(&vocab)?;

    log::info!("Data prepared");

    // Save the vocabularies and model configuration so inference can rebuild the model
    tokio::fs::create_dir_all(&paths.model_dir).await?;
    vocab.save(paths.model_dir.join(VOCAB_FILE)).await?;

    let model_config = config.model_config(vocab.tokens.len(), vocab.labels.len());
    model_config.save(paths.model_dir.join(MODEL_CONFIG_FILE))?;

    // Initialize batchers for training and validation data
    let tokens = Arc::new(vocab.tokens);
    let batcher_train = Batcher::<B>::new(tokens.clone(), device.clone());
    let batcher_valid = Batcher::<B::InnerBackend>::new(tokens, device.clone());

    // Single worker, so only the final batch of an epoch can come up short
    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .build(records_train);

    let dataloader_valid = DataLoaderBuilder::new(batcher_valid)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .build(records_valid);

    log::info!("Creating model...");

    let model = model_config.init_with_pretrained::<B>(vectors.to_tensor(&device), &device)?;

    log::info!(
        "The model has {} trainable parameters",
        model.num_params() - model.embedding.num_params()
    );

    let mut checkpointer = Checkpointer::new(&paths.model_dir, config.retention)?;

    let (_, history) = learn(
        model,
        dataloader_train,
        dataloader_valid,
        &config,
        &mut checkpointer,
        &device,
    )?;

    // Save the history along with the configuration that produced it
    tokio::fs::create_dir_all(&paths.output_data_dir).await?;
    tokio::fs::write(
        paths.output_data_dir.join(HISTORY_FILE),
        serde_json::to_string_pretty(&history)?,
    )
    .await?;
    config.save(paths.output_data_dir.join(TRAINING_CONFIG_FILE))?;

    Ok(history)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use burn::{
        backend::{Autodiff, NdArray},
        config::Config as _,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{models::lstm, text::Vocabularies};

    type B = Autodiff<NdArray>;

    const WORDS: [&str; 6] = ["good", "bad", "film", "plot", "dull", "fun"];

    fn write(path: PathBuf, contents: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn fixture(root: &std::path::Path) -> Paths {
        let paths = Paths {
            train: root.join("train"),
            vectors: root.join("glove.txt"),
            model_dir: root.join("model"),
            output_data_dir: root.join("output"),
        };

        std::fs::create_dir_all(&paths.train).unwrap();

        let mut tsv = String::from("PhraseId\tSentenceId\tPhrase\tSentiment\n");
        for i in 0..100 {
            let phrase = format!("{} {}", WORDS[i % WORDS.len()], WORDS[(i / 3) % WORDS.len()]);
            tsv.push_str(&format!("{}\t{}\t{}\t{}\n", i + 1, i / 10 + 1, phrase, i % 5));
        }
        write(paths.train.join(TRAIN_FILE), &tsv);

        let glove: String = WORDS
            .iter()
            .enumerate()
            .map(|(i, word)| format!("{word} {i}.0 0.5 -0.5 0.25\n"))
            .collect();
        write(paths.vectors.clone(), &glove);

        paths
    }

    #[tokio::test]
    async fn trains_and_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = fixture(dir.path());
        let config = Config::new()
            .with_num_epochs(2)
            .with_batch_size(4)
            .with_embedding_size(4)
            .with_hidden_size(3);

        let history = train::<B>(Default::default(), &paths, config).await.unwrap();

        assert_eq!(history.train.len(), 2);
        assert_eq!(history.valid.len(), 2);
        for stats in history.train.iter().chain(history.valid.iter()) {
            assert!(stats.loss >= 0.0);
            assert!((0.0..=1.0).contains(&stats.accuracy));
        }

        let vocab = Vocabularies::load(paths.model_dir.join(VOCAB_FILE)).await.unwrap();
        assert_eq!(vocab.labels.len(), 5);

        let model_config = lstm::Config::load(paths.model_dir.join(MODEL_CONFIG_FILE)).unwrap();
        assert_eq!(model_config.vocab_size, vocab.tokens.len());
        assert_eq!(model_config.output_size, 5);
        assert_eq!(model_config.embedding_size, 4);

        let saved: History = serde_json::from_str(
            &std::fs::read_to_string(paths.output_data_dir.join(HISTORY_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(saved.valid.len(), 2);
        assert!((saved.best_accuracy - history.best_accuracy).abs() < 1e-9);
    }

    #[tokio::test]
    async fn mismatched_vector_dimensions_fail() {
        let dir = tempfile::tempdir().unwrap();
        let paths = fixture(dir.path());
        let config = Config::new().with_num_epochs(1).with_batch_size(4);

        let result = train::<B>(Default::default(), &paths, config).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_phrase_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = fixture(dir.path());
        paths.train = dir.path().join("missing");

        let result = train::<B>(Default::default(), &paths, Config::new()).await;

        assert!(result.is_err());
    }
}
