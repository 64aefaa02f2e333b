use std::sync::Arc;

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;

use crate::{
    datasets::PhraseRecord,
    text::{tokenize, vocab::PAD_INDEX, Vocab},
    utils::tensors::{int_vector, pad_seq_first},
};

/// An inference batch for sentiment classification
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Token ids, sequence-first: [max_seq_length, batch_size]
    pub tokens: Tensor<B, 2, Int>,

    /// Unpadded length of each sequence
    pub lengths: Vec<usize>,
}

impl<B: Backend> Infer<B> {
    /// The number of sequences (columns) in the token tensor
    pub fn batch_size(&self) -> usize {
        self.tokens.dims()[1]
    }
}

/// A training batch for sentiment classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// Class ids for the batch
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Train<B> {
    /// The number of labeled samples in the batch
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    /// Whether the batch has no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `<pad>`-only columns to the token tensor until it holds `batch_size` sequences.
    ///
    /// Targets are left alone, so the padding columns never contribute to the loss.
    pub fn pad_to(self, batch_size: usize) -> Self {
        let [seq_length, current] = self.input.tokens.dims();

        if current >= batch_size {
            return self;
        }

        let device = self.input.tokens.device();
        let padding = Tensor::<B, 2, Int>::zeros([seq_length, batch_size - current], &device)
            .add_scalar(PAD_INDEX as i64);

        Self {
            input: Infer {
                tokens: Tensor::cat(vec![self.input.tokens, padding], 1),
                lengths: self.input.lengths,
            },
            targets: self.targets,
        }
    }
}

/// Struct for batching phrases
#[derive(Clone, new)]
pub struct Batcher<B: Backend> {
    /// Vocabulary for raw text inference
    vocab: Arc<Vocab>,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    device: B::Device,
}

impl<B: Backend> Batcher<B> {
    fn pad(&self, token_ids_list: Vec<Vec<usize>>) -> Infer<B> {
        let lengths: Vec<usize> = token_ids_list.iter().map(Vec::len).collect();

        // Empty phrases still occupy one (padding) time step
        let max_seq_length = lengths.iter().copied().max().unwrap_or(0).max(1);

        Infer {
            tokens: pad_seq_first(PAD_INDEX, &token_ids_list, max_seq_length, &self.device),
            lengths,
        }
    }
}

/// Implement Batcher trait for Batcher struct for inference
impl<B: Backend> dataloader::batcher::Batcher<String, Infer<B>> for Batcher<B> {
    /// Tokenizes and pads raw phrases into an inference batch
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        let token_ids_list = items
            .iter()
            .map(|input| self.vocab.encode(&tokenize(input)))
            .collect();

        self.pad(token_ids_list)
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend> dataloader::batcher::Batcher<PhraseRecord, Train<B>> for Batcher<B> {
    /// Collects encoded phrases into a training batch
    fn batch(&self, items: Vec<PhraseRecord>) -> Train<B> {
        let class_ids: Vec<usize> = items.iter().map(|item| item.label).collect();
        let input = self.pad(items.into_iter().map(|item| item.tokens).collect());

        Train {
            input,
            targets: int_vector(&class_ids, &self.device),
        }
    }
}
