use std::path::Path;

use burn::tensor::{backend::Backend, Data, Shape, Tensor};

use crate::utils::files::file_reader;

use super::Vocab;

/// The pretrained vectors used by default (Stanford GloVe, 6B tokens, 100 dimensions)
pub static DEFAULT_VECTORS: &str = "glove.6B.100d.txt";

/// Pretrained Vectors Error
#[derive(thiserror::Error, Debug)]
pub enum VectorsError {
    /// Unable to read the vectors file
    #[error("unable to read pretrained vectors: {0}")]
    Io(#[from] std::io::Error),

    /// A vector did not have the expected number of components
    #[error("vector for {token:?} on line {line} has {found} components, expected {expected}")]
    Dimension {
        /// The token whose vector is malformed
        token: String,
        /// The 1-based line number
        line: usize,
        /// The configured embedding size
        expected: usize,
        /// The number of components present
        found: usize,
    },

    /// A vector component is not a number
    #[error("invalid component for {token:?} on line {line}: {source}")]
    Component {
        /// The token whose vector is malformed
        token: String,
        /// The 1-based line number
        line: usize,
        /// The parse failure
        source: std::num::ParseFloatError,
    },
}

/// A `[vocab_size, dim]` table of pretrained vectors aligned with a [`Vocab`]
#[derive(Clone, Debug, PartialEq)]
pub struct PretrainedVectors {
    /// Row-major vector values, one row per vocabulary entry
    pub values: Vec<f32>,

    /// The number of rows (the vocabulary size)
    pub rows: usize,

    /// The vector dimension
    pub dim: usize,

    /// How many vocabulary entries had a pretrained vector
    pub found: usize,
}

impl PretrainedVectors {
    /// A table of zeros, the starting point for entries with no pretrained vector
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            values: vec![0.0; rows * dim],
            rows,
            dim,
            found: 0,
        }
    }

    /// Stream a GloVe-formatted text file, keeping vectors for vocabulary entries only
    pub async fn load(path: impl AsRef<Path>, vocab: &Vocab, dim: usize) -> Result<Self, VectorsError> {
        let path = path.as_ref();
        log::info!("Loading pretrained vectors from {}", path.display());

        let mut vectors = Self::zeros(vocab.len(), dim);
        let mut lines = file_reader(path).await?;
        let mut line_number = 0;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            vectors.insert_line(vocab, &line, line_number)?;
        }

        log::info!(
            "Found pretrained vectors for {} of {} vocabulary entries",
            vectors.found,
            vocab.len()
        );

        Ok(vectors)
    }

    /// Parse one `word v1 ... vD` line into the table if the word is in the vocabulary
    fn insert_line(&mut self, vocab: &Vocab, line: &str, line_number: usize) -> Result<(), VectorsError> {
        let mut parts = line.trim_end().split(' ');

        let token = match parts.next() {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(()),
        };

        let index = vocab.lookup(token);

        // Only exact matches are kept, everything else falls back to <unk>
        if vocab.token(index) != Some(token) {
            return Ok(());
        }

        let components = parts
            .map(|component| {
                component
                    .parse::<f32>()
                    .map_err(|source| VectorsError::Component {
                        token: token.to_string(),
                        line: line_number,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if components.len() != self.dim {
            return Err(VectorsError::Dimension {
                token: token.to_string(),
                line: line_number,
                expected: self.dim,
                found: components.len(),
            });
        }

        let start = index * self.dim;
        self.values[start..start + self.dim].copy_from_slice(&components);
        self.found += 1;

        Ok(())
    }

    /// Convert the table into a float tensor on the given device
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let data = Data::new(self.values.clone(), Shape::new([self.rows, self.dim]));

        Tensor::from_data(data.convert::<B::FloatElem>(), device)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::text::{tokenize, vocab::DEFAULT_MAX_SIZE};

    fn vocab() -> Vocab {
        Vocab::build(&[tokenize("good bad good")], DEFAULT_MAX_SIZE)
    }

    fn glove(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn keeps_vocabulary_vectors_and_zero_fills_the_rest() {
        let file = glove("the 0.1 0.2 0.3\ngood 1 2 3\nbad -1 -2 -3\n");

        let vectors = PretrainedVectors::load(file.path(), &vocab(), 3).await.unwrap();

        assert_eq!(vectors.rows, 4);
        assert_eq!(vectors.found, 2);
        assert_eq!(
            vectors.values,
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, -1.0, -2.0, -3.0]
        );
    }

    #[tokio::test]
    async fn rejects_vectors_of_the_wrong_dimension() {
        let file = glove("good 1 2\n");

        let result = PretrainedVectors::load(file.path(), &vocab(), 3).await;

        assert!(matches!(
            result,
            Err(VectorsError::Dimension { line: 1, found: 2, .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = PretrainedVectors::load("/nonexistent/glove.txt", &vocab(), 3).await;

        assert!(matches!(result, Err(VectorsError::Io(_))));
    }
}
