use burn::{
    module::{Module, Param},
    nn::{DropoutConfig, Embedding, EmbeddingConfig, LinearConfig, LstmConfig},
    tensor::{backend::Backend, Tensor},
};

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// Number of vocabulary entries (rows of the embedding table)
    pub vocab_size: usize,

    /// Number of sentiment classes
    pub output_size: usize,

    /// Size of each word vector, must match the pretrained vectors
    #[config(default = 100)]
    pub embedding_size: usize,

    /// Size of the LSTM hidden state
    #[config(default = 100)]
    pub hidden_size: usize,

    /// Number of stacked LSTM layers
    #[config(default = 2)]
    pub num_layers: usize,

    /// Dropout applied between LSTM layers while training
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl Config {
    /// Initialize the model with a randomly filled, frozen embedding table.
    ///
    /// Used to rebuild the model before loading a checkpoint record over it.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_size).init(device);

        self.init_with_embedding(embedding, device)
    }

    /// Initialize the model with an embedding table copied from pretrained vectors.
    ///
    /// The table is frozen: gradients never flow into it, so optimizer steps leave it untouched.
    pub fn init_with_pretrained<B: Backend>(
        &self,
        vectors: Tensor<B, 2>,
        device: &B::Device,
    ) -> anyhow::Result<Model<B>> {
        let dims = vectors.dims();

        if dims != [self.vocab_size, self.embedding_size] {
            return Err(anyhow!(
                "Pretrained vectors have shape {:?}, expected [{}, {}]",
                dims,
                self.vocab_size,
                self.embedding_size
            ));
        }

        let embedding = Embedding {
            weight: Param::from_tensor(vectors.to_device(device)),
        };

        Ok(self.init_with_embedding(embedding, device))
    }

    fn init_with_embedding<B: Backend>(&self, embedding: Embedding<B>, device: &B::Device) -> Model<B> {
        let encoder = (0..self.num_layers)
            .map(|layer| {
                let d_input = if layer == 0 {
                    self.embedding_size
                } else {
                    self.hidden_size
                };

                LstmConfig::new(d_input, self.hidden_size, true).init(device)
            })
            .collect();

        Model {
            embedding: embedding.no_grad(),
            encoder,
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.hidden_size, self.output_size).init(device),
            hidden_size: self.hidden_size,
        }
    }
}
