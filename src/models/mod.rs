/// LSTM classifier
pub mod lstm;
