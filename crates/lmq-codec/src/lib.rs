//! # lmq-codec
//!
//! Quantized storage of n-gram probabilities and backoff weights: trained
//! codebooks and the packing of (probability, backoff) pairs into trie
//! entries.

pub mod bins;
pub mod builder;
pub mod quantizer;

pub use bins::{train_bins, BinSpan, Bins};
pub use builder::QuantizerBuilder;
pub use quantizer::{NgramWeights, Quantizer};
