use burn::{
    module::Module,
    nn::{loss::CrossEntropyLoss, Dropout, Embedding, Linear, Lstm},
    tensor::{activation::softmax, backend::Backend, Int, Tensor},
    train::ClassificationOutput,
};

use crate::pipelines::sentiment::batcher;

/// The recurrent encoder's carried memory, each tensor shaped `[num_layers, batch_size, hidden_size]`
#[derive(Clone, Debug)]
pub struct HiddenState<B: Backend> {
    /// Cell memory
    pub cell: Tensor<B, 3>,

    /// Hidden activation
    pub hidden: Tensor<B, 3>,
}

impl<B: Backend> HiddenState<B> {
    /// An all-zero state
    pub fn zeros(
        num_layers: usize,
        batch_size: usize,
        hidden_size: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            cell: Tensor::zeros([num_layers, batch_size, hidden_size], device),
            hidden: Tensor::zeros([num_layers, batch_size, hidden_size], device),
        }
    }

    /// Sever the gradient history, so the next backward pass stops at this state
    pub fn detach(self) -> Self {
        Self {
            cell: self.cell.detach(),
            hidden: self.hidden.detach(),
        }
    }

    /// `[num_layers, batch_size, hidden_size]`
    pub fn dims(&self) -> [usize; 3] {
        self.hidden.dims()
    }

    /// The `(cell, hidden)` pair for one layer, each `[batch_size, hidden_size]`
    fn layer(&self, layer: usize) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [_, batch_size, hidden_size] = self.dims();
        let select = |tensor: &Tensor<B, 3>| {
            tensor
                .clone()
                .slice([layer..layer + 1, 0..batch_size, 0..hidden_size])
                .reshape([batch_size, hidden_size])
        };

        (select(&self.cell), select(&self.hidden))
    }
}

/// Stacked LSTM sentiment classifier over a frozen pretrained embedding
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Word vectors, frozen after initialization
    pub embedding: Embedding<B>,

    /// One LSTM per layer, the first consuming word vectors and the rest the layer below
    pub encoder: Vec<Lstm<B>>,

    /// Dropout between LSTM layers (inactive outside of training)
    pub dropout: Dropout,

    /// Projection of the top layer's final hidden activation onto class logits
    pub output: Linear<B>,

    /// Size of the LSTM hidden state
    pub hidden_size: usize,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// The number of stacked LSTM layers
    pub fn num_layers(&self) -> usize {
        self.encoder.len()
    }

    /// Encode a sequence-first `[seq_length, batch_size]` token batch.
    ///
    /// Returns `[batch_size, output_size]` logits along with the updated state. Without a prior
    /// state the encoder starts from zeros sized to the batch.
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        state: Option<HiddenState<B>>,
    ) -> (Tensor<B, 2>, HiddenState<B>) {
        let [seq_length, batch_size] = tokens.dims();
        let num_layers = self.num_layers();
        let device = tokens.device();

        let state = state.unwrap_or_else(|| {
            HiddenState::zeros(num_layers, batch_size, self.hidden_size, &device)
        });

        // Burn's recurrent modules are batch-first
        let mut x = self.embedding.forward(tokens.swap_dims(0, 1));

        let mut cells = Vec::with_capacity(num_layers);
        let mut hiddens = Vec::with_capacity(num_layers);

        for (layer, lstm) in self.encoder.iter().enumerate() {
            let (cell_states, hidden_states) = lstm.forward(x, Some(state.layer(layer)));

            let last = |states: Tensor<B, 3>| {
                states
                    .slice([0..batch_size, seq_length - 1..seq_length, 0..self.hidden_size])
                    .reshape([1, batch_size, self.hidden_size])
            };

            cells.push(last(cell_states));
            hiddens.push(last(hidden_states.clone()));

            x = if layer + 1 < num_layers {
                self.dropout.forward(hidden_states)
            } else {
                hidden_states
            };
        }

        let state = HiddenState {
            cell: Tensor::cat(cells, 0),
            hidden: Tensor::cat(hiddens, 0),
        };

        let top = state
            .hidden
            .clone()
            .slice([num_layers - 1..num_layers, 0..batch_size, 0..self.hidden_size])
            .reshape([batch_size, self.hidden_size]);

        (self.output.forward(top), state)
    }

    /// Forward pass with cross-entropy loss against the batch targets.
    ///
    /// When the token tensor carries padding rows beyond the targets, only the leading rows
    /// that have a target contribute to the loss.
    pub fn forward_classification(
        &self,
        item: batcher::Train<B>,
        state: Option<HiddenState<B>>,
        loss: &CrossEntropyLoss<B>,
    ) -> (ClassificationOutput<B>, HiddenState<B>) {
        let device = item.input.tokens.device();
        let [n_samples] = item.targets.dims();

        let (logits, state) = self.forward(item.input.tokens, state);
        let [_, n_classes] = logits.dims();

        let output = logits.slice([0..n_samples, 0..n_classes]);
        let targets = item.targets.to_device(&device);

        let loss = loss.forward(output.clone(), targets.clone());

        (
            ClassificationOutput {
                loss,
                output,
                targets,
            },
            state,
        )
    }

    /// Class probabilities for an inference batch
    pub fn infer(&self, input: batcher::Infer<B>) -> Tensor<B, 2> {
        let (logits, _) = self.forward(input.tokens, None);

        softmax(logits, 1)
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        tensor::{Data, Distribution, Shape},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{models::lstm::Config, utils::tensors::pad_seq_first};

    type B = NdArray;

    fn config() -> Config {
        Config::new(12, 5)
            .with_embedding_size(6)
            .with_hidden_size(4)
    }

    fn tokens(device: &<B as Backend>::Device) -> Tensor<B, 2, Int> {
        pad_seq_first::<B>(1, &[vec![2, 3, 4], vec![5, 6], vec![7]], 3, device)
    }

    #[test]
    fn output_and_state_shapes() {
        let device = Default::default();
        let model = config().init::<B>(&device);

        let (logits, state) = model.forward(tokens(&device), None);

        assert_eq!(logits.dims(), [3, 5]);
        assert_eq!(state.dims(), [2, 3, 4]);
        assert_eq!(state.cell.dims(), [2, 3, 4]);
    }

    #[test]
    fn missing_state_is_equivalent_to_zeros() {
        let device = Default::default();
        let model = config().init::<B>(&device);

        let (from_none, _) = model.forward(tokens(&device), None);
        let (from_zeros, _) = model.forward(tokens(&device), Some(HiddenState::zeros(2, 3, 4, &device)));

        assert_eq!(from_none.into_data(), from_zeros.into_data());
    }

    #[test]
    fn forward_is_deterministic() {
        let device = Default::default();
        let model = config().init::<B>(&device);
        let state = HiddenState {
            cell: Tensor::random([2, 3, 4], Distribution::Normal(0.0, 1.0), &device),
            hidden: Tensor::random([2, 3, 4], Distribution::Normal(0.0, 1.0), &device),
        };

        let (logits_a, state_a) = model.forward(tokens(&device), Some(state.clone()));
        let (logits_b, state_b) = model.forward(tokens(&device), Some(state));

        assert_eq!(logits_a.into_data(), logits_b.into_data());
        assert_eq!(state_a.cell.into_data(), state_b.cell.into_data());
        assert_eq!(state_a.hidden.into_data(), state_b.hidden.into_data());
    }

    #[test]
    fn carried_state_changes_the_output() {
        let device = Default::default();
        let model = config().init::<B>(&device);

        let (first, state) = model.forward(tokens(&device), None);
        let (second, _) = model.forward(tokens(&device), Some(state));

        assert_ne!(first.into_data(), second.into_data());
    }

    #[test]
    fn pretrained_vectors_are_copied_into_the_embedding() {
        let device = Default::default();
        let values: Vec<f32> = (0..72).map(|v| v as f32 / 10.0).collect();
        let vectors = Tensor::<B, 2>::from_data(
            Data::new(values.clone(), Shape::new([12, 6])),
            &device,
        );

        let model = config().init_with_pretrained(vectors, &device).unwrap();

        assert_eq!(model.embedding.weight.val().into_data().value, values);
    }

    #[test]
    fn pretrained_vectors_must_match_the_config() {
        let device = Default::default();
        let vectors = Tensor::<B, 2>::zeros([12, 7], &device);

        assert!(config().init_with_pretrained(vectors, &device).is_err());
    }

    #[test]
    fn embedding_does_not_receive_gradients() {
        type AB = Autodiff<NdArray>;
        let device = Default::default();
        let model = config().init::<AB>(&device);
        let tokens = pad_seq_first::<AB>(1, &[vec![2, 3], vec![4, 5]], 2, &device);

        let (logits, _) = model.forward(tokens, None);
        let grads = logits.sum().backward();

        assert!(model.embedding.weight.grad(&grads).is_none());
        assert!(model.output.weight.grad(&grads).is_some());
    }

    #[test]
    fn probabilities_sum_to_one() {
        let device = Default::default();
        let model = config().init::<B>(&device);

        let probabilities = model.infer(batcher::Infer::new(tokens(&device), vec![3, 2, 1]));
        let sums = probabilities.sum_dim(1).into_data().value;

        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }
}
