use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Pad token sequences into a sequence-first `[seq_length, batch_size]` tensor.
///
/// Column `b` holds sequence `b`; sequences longer than `seq_length` are truncated.
pub fn pad_seq_first<B: Backend>(
    pad_token: usize,
    tokens_list: &[Vec<usize>],
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = tokens_list.len();

    let mut values = vec![pad_token; seq_length * batch_size];

    for (column, tokens) in tokens_list.iter().enumerate() {
        for (row, token) in tokens.iter().take(seq_length).enumerate() {
            values[row * batch_size + column] = *token;
        }
    }

    let values: Vec<B::IntElem> = values.into_iter().map(|e| (e as i64).elem()).collect();

    Tensor::from_data(
        Data::new(values, Shape::new([seq_length, batch_size])),
        device,
    )
}

/// Build a 1D integer tensor, typically class ids
pub fn int_vector<B: Backend>(values: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let values: Vec<B::IntElem> = values.iter().map(|e| (*e as i64).elem()).collect();
    let len = values.len();

    Tensor::from_data(Data::new(values, Shape::new([len])), device)
}
