//! # lmq-core
//!
//! Shared vocabulary for the quantized n-gram weight codec: the quantization
//! scheme, per-entry bit widths, configuration and the crate-wide error type.

pub mod config;
pub mod error;
pub mod scheme;

pub use config::QuantConfig;
pub use error::{LmqError, Result};
pub use scheme::{longest_entry_bits, middle_entry_bits, quant_floats, quant_size, QuantScheme};

/// Width in bits of a full IEEE-754 single-precision field.
pub const FLOAT_BITS: u8 = 32;

/// Width in bits of a sign-stripped non-positive float field.
pub const NEG_FLOAT_BITS: u8 = 31;
