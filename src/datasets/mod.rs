/// The labeled phrase dataset (tab-separated phrases with 5-way sentiment labels)
pub mod phrases;

pub use phrases::{Dataset, Item, PhraseRecord};

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// Unable to read or parse the input file
    #[error("unable to load dataset {path}: {source}")]
    Load {
        /// The file being read
        path: String,
        /// The underlying failure
        source: std::io::Error,
    },

    /// A label appears that the training split never produced
    #[error("label {label:?} of phrase {phrase_id} was not seen in the training split")]
    UnknownLabel {
        /// The unknown label
        label: String,
        /// The phrase carrying it
        phrase_id: u64,
    },
}
