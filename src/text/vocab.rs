use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use serde::{Deserialize, Serialize};

/// The token used for out-of-vocabulary words
pub static UNK_TOKEN: &str = "<unk>";

/// The token used to pad sequences within a batch
pub static PAD_TOKEN: &str = "<pad>";

/// Index of [`UNK_TOKEN`]
pub const UNK_INDEX: usize = 0;

/// Index of [`PAD_TOKEN`]
pub const PAD_INDEX: usize = 1;

/// The default cap on the number of non-special vocabulary entries
pub const DEFAULT_MAX_SIZE: usize = 15_000;

/// Vocabulary Error
#[derive(thiserror::Error, Debug)]
pub enum VocabError {
    /// Unable to read or write the vocabulary file
    #[error("vocabulary file error: {0}")]
    Io(#[from] std::io::Error),

    /// The vocabulary file is not valid JSON
    #[error("invalid vocabulary file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Order `(entry, count)` pairs by descending count, breaking ties by ascending entry
fn by_frequency<'a, I: IntoIterator<Item = &'a str>>(entries: I) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        *counts.entry(entry).or_default() += 1;
    }

    let mut ordered: Vec<(&str, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ordered.into_iter().map(|(entry, _)| entry.to_string()).collect()
}

/// A token vocabulary mapping words to embedding rows
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocab {
    itos: Vec<String>,
    stoi: HashMap<String, usize>,
}

impl Vocab {
    /// Build a vocabulary from tokenized training phrases.
    ///
    /// The two specials come first, followed by at most `max_size` tokens ordered by descending
    /// frequency (ties broken alphabetically).
    pub fn build<'a, I, T>(token_lists: I, max_size: usize) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        T: AsRef<[String]> + 'a + ?Sized,
    {
        let tokens = token_lists
            .into_iter()
            .flat_map(|tokens| tokens.as_ref().iter().map(String::as_str))
            .filter(|token| *token != UNK_TOKEN && *token != PAD_TOKEN);

        let mut itos = vec![UNK_TOKEN.to_string(), PAD_TOKEN.to_string()];
        itos.extend(by_frequency(tokens).into_iter().take(max_size));

        Self::from(itos)
    }

    /// Look up the index of a token, falling back to [`UNK_INDEX`]
    pub fn lookup(&self, token: &str) -> usize {
        self.stoi.get(token).copied().unwrap_or(UNK_INDEX)
    }

    /// Encode a token sequence
    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<usize> {
        tokens.iter().map(|token| self.lookup(token.as_ref())).collect()
    }

    /// The token at the given index
    pub fn token(&self, index: usize) -> Option<&str> {
        self.itos.get(index).map(String::as_str)
    }

    /// Iterate over `(index, token)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.itos.iter().map(String::as_str).enumerate()
    }

    /// The number of entries, specials included
    pub fn len(&self) -> usize {
        self.itos.len()
    }

    /// Whether the vocabulary is empty (never true for a built vocabulary)
    pub fn is_empty(&self) -> bool {
        self.itos.is_empty()
    }
}

impl From<Vec<String>> for Vocab {
    fn from(itos: Vec<String>) -> Self {
        let stoi = itos
            .iter()
            .enumerate()
            .map(|(index, token)| (token.clone(), index))
            .collect();

        Self { itos, stoi }
    }
}

impl From<Vocab> for Vec<String> {
    fn from(vocab: Vocab) -> Self {
        vocab.itos
    }
}

/// The class label vocabulary, ordered by label frequency in the training split
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelVocab {
    /// A mapping from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,

    /// A mapping from class name labels to class ids
    pub label2id: BTreeMap<String, usize>,
}

impl LabelVocab {
    /// Build the label vocabulary from the training labels
    pub fn build<'a, I: IntoIterator<Item = &'a str>>(labels: I) -> Self {
        Self::from(by_frequency(labels))
    }

    /// The class id for a label, if it was seen during training
    pub fn index(&self, label: &str) -> Option<usize> {
        self.label2id.get(label).copied()
    }

    /// The label for a class id
    pub fn label(&self, index: usize) -> Option<&str> {
        self.id2label.get(&index).map(String::as_str)
    }

    /// The number of classes
    pub fn len(&self) -> usize {
        self.id2label.len()
    }

    /// Whether there are no classes
    pub fn is_empty(&self) -> bool {
        self.id2label.is_empty()
    }
}

impl From<Vec<String>> for LabelVocab {
    fn from(labels: Vec<String>) -> Self {
        let label2id = labels
            .iter()
            .enumerate()
            .map(|(id, label)| (label.clone(), id))
            .collect();
        let id2label = labels.into_iter().enumerate().collect();

        Self { id2label, label2id }
    }
}

impl From<LabelVocab> for Vec<String> {
    fn from(labels: LabelVocab) -> Self {
        labels.id2label.into_values().collect()
    }
}

/// Token and label vocabularies, persisted next to the model checkpoints
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabularies {
    /// Phrase tokens
    pub tokens: Vocab,

    /// Sentiment labels
    pub labels: LabelVocab,
}

impl Vocabularies {
    /// Save both vocabularies as JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), VocabError> {
        let json = serde_json::to_string(self)?;
        tokio::fs::write(path, json).await?;

        Ok(())
    }

    /// Load both vocabularies from JSON
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, VocabError> {
        let json = tokio::fs::read_to_string(path).await?;

        Ok(serde_json::from_str(&json)?)
    }
}
