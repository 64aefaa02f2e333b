//! Command line tool for inference

use anyhow::{anyhow, Result};
use burn::backend::LibTorch;
use pico_args::Arguments;
use sentiment_estimator::{
    cli::{device, parse_bool},
    pipelines::sentiment,
};

const HELP: &str = "\
Usage: infer --model-dir DIR --checkpoint NAME [OPTIONS] PHRASE...

Arguments:
  PHRASE               One or more phrases to classify

Options:
  -h, --help           Print help
  -m, --model-dir      Directory holding config.json, vocab.json and the checkpoints
  -c, --checkpoint     The checkpoint to load (relative to the model directory)
  --use-cuda BOOL      Run on CUDA when available (defaults to false)
";

#[derive(Debug)]
struct Args {
    /// Prints the usage menu
    help: bool,

    /// Directory holding the training artifacts
    model_dir: String,

    /// The checkpoint to load
    checkpoint: String,

    /// Run on CUDA when available
    use_cuda: bool,

    /// The phrases to classify
    phrases: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        return Ok(Args {
            help: true,
            model_dir: String::new(),
            checkpoint: String::new(),
            use_cuda: false,
            phrases: Vec::new(),
        });
    }

    let args = Args {
        help: false,
        model_dir: pargs
            .opt_value_from_str(["-m", "--model-dir"])?
            .ok_or_else(|| anyhow!("Missing required option: --model-dir"))?,
        checkpoint: pargs
            .opt_value_from_str(["-c", "--checkpoint"])?
            .ok_or_else(|| anyhow!("Missing required option: --checkpoint"))?,
        use_cuda: pargs
            .opt_value_from_fn("--use-cuda", parse_bool)?
            .unwrap_or(false),
        phrases: pargs
            .finish()
            .into_iter()
            .map(|phrase| phrase.to_string_lossy().into_owned())
            .collect(),
    };

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = parse_args()?;

    if args.help {
        println!("{}", HELP);
        return Ok(());
    }

    if args.phrases.is_empty() {
        return Err(anyhow!("Nothing to classify, pass at least one PHRASE"));
    }

    let device = device::select(args.use_cuda);

    let predictions =
        sentiment::infer::<LibTorch>(device, &args.model_dir, &args.checkpoint, args.phrases).await?;

    for prediction in predictions {
        println!(
            "{}\t{:.4}\t{}",
            prediction.label, prediction.probability, prediction.phrase
        );
    }

    Ok(())
}
