//! Command line tool to train the sentiment classifier

use burn::backend::{Autodiff, LibTorch};
use pico_args::Arguments;
use sentiment_estimator::{
    cli::{device, Settings},
    pipelines::sentiment,
};

const HELP: &str = "\
Usage: train [OPTIONS]

Options:
  -h, --help               Print help
  --epochs N               Number of epochs to train for (defaults to 30)
  --batch-size N           Batch size (defaults to 64)
  --learning-rate LR       Adam learning rate (defaults to 0.001)
  --use-cuda BOOL          Train on CUDA when available (defaults to true)
  --output-data-dir DIR    Where to write the training history (or SM_OUTPUT_DATA_DIR)
  --model-dir DIR          Where to write checkpoints (or SM_MODEL_DIR)
  --train DIR              Directory holding train.tsv (or SM_CHANNEL_TRAIN)
  --test DIR               Test channel directory (or SM_CHANNEL_TEST)
  --vectors FILE           GloVe vectors (defaults to .vector_cache/glove.6B.100d.txt)
  --keep-best N            Keep only the N best checkpoints
  --pad-ragged             Pad short batches instead of skipping them
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{}", HELP);

        return Ok(());
    }

    let settings = Settings::parse(pargs)?;
    let config = settings.training_config();

    log::info!("Test channel {} is not used for training", settings.test.display());

    let device = device::select(settings.use_cuda);

    let history = sentiment::train::<Autodiff<LibTorch>>(device, &settings.paths, config).await?;

    log::info!("Best validation accuracy: {}", history.best_accuracy);

    Ok(())
}
