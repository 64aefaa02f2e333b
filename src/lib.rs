//! # Sentiment Estimator
#![forbid(unsafe_code)]

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Text preprocessing: tokenization, vocabularies and pretrained vectors
pub mod text;

/// Utilities
pub mod utils;

/// CLI settings and device selection
pub mod cli;

/// Error macros
#[macro_use]
extern crate anyhow;
