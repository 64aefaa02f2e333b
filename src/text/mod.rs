/// Phrase tokenization
pub mod tokenizer;

/// Token and label vocabularies
pub mod vocab;

/// Pretrained word vectors
pub mod vectors;

pub use tokenizer::tokenize;
pub use vectors::PretrainedVectors;
pub use vocab::{LabelVocab, Vocab, Vocabularies};
