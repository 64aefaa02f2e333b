/// Sentiment Classification
pub mod sentiment;
