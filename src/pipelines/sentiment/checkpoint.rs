use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use burn::{
    module::Module,
    record::{DefaultRecorder, FileRecorder, Recorder, RecorderError},
    tensor::backend::Backend,
};

use super::config::RetentionPolicy;

/// Prefix of every checkpoint file name
pub static CHECKPOINT_TAG: &str = "sentiment-estimator";

/// Extension the full-precision MessagePack recorder appends to checkpoint files
pub static CHECKPOINT_EXTENSION: &str = "mpk";

/// Strip the recorder extension, giving the path the recorder expects to be handed
pub fn checkpoint_stem(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let suffix = format!(".{CHECKPOINT_EXTENSION}");

    match path.to_str().and_then(|p| p.strip_suffix(&suffix)) {
        Some(stem) => PathBuf::from(stem),
        None => path.to_path_buf(),
    }
}

/// Checkpoint Error
#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    /// Unable to create the checkpoint directory or remove an old checkpoint
    #[error("checkpoint file error: {0}")]
    Io(#[from] std::io::Error),

    /// Unable to serialize the model record
    #[error("unable to record checkpoint {path}: {source}")]
    Record {
        /// The checkpoint being written
        path: String,
        /// The recorder failure
        source: RecorderError,
    },
}

/// Tracks the best validation accuracy seen so far
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BestAccuracy(f64);

impl BestAccuracy {
    /// Record an accuracy, returning whether it strictly beats the best so far
    pub fn improve(&mut self, accuracy: f64) -> bool {
        if accuracy > self.0 {
            self.0 = accuracy;
            true
        } else {
            false
        }
    }

    /// The best accuracy so far (0 before any improvement)
    pub fn get(&self) -> f64 {
        self.0
    }
}

/// Persists the model whenever validation accuracy improves
pub struct Checkpointer {
    dir: PathBuf,
    best: BestAccuracy,
    retention: RetentionPolicy,
    saved: VecDeque<PathBuf>,
}

impl Checkpointer {
    /// Create a checkpointer writing into `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>, retention: RetentionPolicy) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            best: BestAccuracy::default(),
            retention,
            saved: VecDeque::new(),
        })
    }

    /// The best accuracy seen so far
    pub fn best_accuracy(&self) -> f64 {
        self.best.get()
    }

    /// Checkpoints currently kept on disk, oldest first
    pub fn saved(&self) -> impl Iterator<Item = &Path> {
        self.saved.iter().map(PathBuf::as_path)
    }

    /// Save the model if `accuracy` beats every earlier epoch, returning the written file
    pub fn observe<B: Backend, M: Module<B>>(
        &mut self,
        model: &M,
        epoch: usize,
        accuracy: f64,
    ) -> Result<Option<PathBuf>, CheckpointError> {
        if !self.best.improve(accuracy) {
            return Ok(None);
        }

        log::info!("  *** New accuracy peak, saving model");

        let path = self.save::<B, M>(model, epoch)?;
        self.saved.push_back(path.clone());
        self.enforce_retention()?;

        Ok(Some(path))
    }

    fn save<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<PathBuf, CheckpointError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        // The recorder appends its own extension
        let stem = self.dir.join(format!("{CHECKPOINT_TAG}-e{epoch}-{timestamp}"));
        let path = stem.with_extension(<DefaultRecorder as FileRecorder<B>>::file_extension());

        log::info!("Saving model {}", path.display());

        DefaultRecorder::new()
            .record(model.clone().into_record(), stem)
            .map_err(|source| CheckpointError::Record {
                path: path.display().to_string(),
                source,
            })?;

        Ok(path)
    }

    fn enforce_retention(&mut self) -> Result<(), CheckpointError> {
        let RetentionPolicy::KeepBest(keep) = self.retention else {
            return Ok(());
        };

        while self.saved.len() > keep.max(1) {
            if let Some(oldest) = self.saved.pop_front() {
                log::info!("Removing superseded checkpoint {}", oldest.display());
                std::fs::remove_file(oldest)?;
            }
        }

        Ok(())
    }
}
