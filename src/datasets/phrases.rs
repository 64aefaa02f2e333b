use std::path::Path;

use burn::data::dataset::{self, Dataset as _, InMemDataset};
use derive_new::new;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::text::{tokenize, LabelVocab, Vocab, Vocabularies};

use super::DatasetError;

/// The file name of the training phrases within the training channel
pub static TRAIN_FILE: &str = "train.tsv";

/// One labeled row of the phrase file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct Item {
    /// Phrase identifier (unused by training)
    #[serde(rename = "PhraseId")]
    pub phrase_id: u64,

    /// Identifier of the sentence the phrase was taken from (unused by training)
    #[serde(rename = "SentenceId")]
    pub sentence_id: u64,

    /// The phrase text, pre-tokenized with spaces
    #[serde(rename = "Phrase")]
    pub phrase: String,

    /// The sentiment class name ("0" through "4")
    #[serde(rename = "Sentiment")]
    pub sentiment: String,
}

/// A phrase encoded against the vocabularies, ready for batching
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct PhraseRecord {
    /// Vocabulary indices of the phrase tokens
    pub tokens: Vec<usize>,

    /// The class id of the sentiment label
    pub label: usize,
}

impl PhraseRecord {
    /// The number of tokens in the phrase
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the phrase has no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Struct for the phrase dataset
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,
}

/// Implement the Dataset trait for the phrase dataset
impl dataset::Dataset<Item> for Dataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Dataset {
    /// Construct a dataset from already-parsed items
    pub fn from_items(items: Vec<Item>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }

    /// Load the tab-separated phrase file (header row, no quoting)
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();

        let mut reader = csv::ReaderBuilder::new();
        reader.delimiter(b'\t').quoting(false).has_headers(true);

        let dataset = InMemDataset::from_csv(path, &reader).map_err(|source| DatasetError::Load {
            path: path.display().to_string(),
            source,
        })?;

        log::info!("Loaded {} phrases from {}", dataset.len(), path.display());

        Ok(Self { dataset })
    }

    /// Randomly split into `(training, validation)`, with `ratio` of the phrases kept for
    /// training
    pub fn split(&self, ratio: f64, seed: u64) -> (Self, Self) {
        let mut items: Vec<Item> = self.dataset.iter().collect();
        items.shuffle(&mut StdRng::seed_from_u64(seed));

        let train_len = ((items.len() as f64) * ratio.clamp(0.0, 1.0)).round() as usize;
        let valid = items.split_off(train_len);

        (Self::from_items(items), Self::from_items(valid))
    }

    /// Build the token and label vocabularies from this (training) split
    pub fn vocabularies(&self, max_size: usize) -> Vocabularies {
        let items: Vec<Item> = self.dataset.iter().collect();

        let token_lists: Vec<Vec<String>> =
            items.iter().map(|item| tokenize(&item.phrase)).collect();

        Vocabularies {
            tokens: Vocab::build(&token_lists, max_size),
            labels: LabelVocab::build(items.iter().map(|item| item.sentiment.as_str())),
        }
    }

    /// Encode every phrase against the vocabularies
    pub fn encode(&self, vocab: &Vocabularies) -> Result<InMemDataset<PhraseRecord>, DatasetError> {
        let records = self
            .dataset
            .iter()
            .map(|item| {
                let label = vocab.labels.index(&item.sentiment).ok_or_else(|| {
                    DatasetError::UnknownLabel {
                        label: item.sentiment.clone(),
                        phrase_id: item.phrase_id,
                    }
                })?;

                let tokens = vocab.tokens.encode(&tokenize(&item.phrase));

                Ok(PhraseRecord { tokens, label })
            })
            .collect::<Result<Vec<_>, DatasetError>>()?;

        Ok(InMemDataset::new(records))
    }
}
