use serde::Deserialize;

use crate::error::LmqError;
use crate::{FLOAT_BITS, NEG_FLOAT_BITS};

/// How probabilities and backoffs are stored in trie entries.
///
/// The discriminant is the 4-byte tag written at the head of a persisted
/// quantizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[repr(i32)]
pub enum QuantScheme {
    /// Raw floats: a 31-bit negative float for the probability and a full
    /// 32-bit float for the backoff.
    #[serde(rename = "none")]
    NoQuantization = 0,
    /// 16-bit codebook indices for both probability and backoff.
    #[serde(rename = "quant16")]
    Quant16 = 1,
}

impl QuantScheme {
    /// Persisted tag value.
    #[inline]
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Bits of one probability code, or 0 when values are stored raw.
    #[inline]
    pub fn prob_bits(self) -> u8 {
        match self {
            QuantScheme::NoQuantization => 0,
            QuantScheme::Quant16 => 16,
        }
    }

    /// Bits of one backoff code, or 0 when values are stored raw.
    #[inline]
    pub fn backoff_bits(self) -> u8 {
        match self {
            QuantScheme::NoQuantization => 0,
            QuantScheme::Quant16 => 16,
        }
    }

    /// Whether a codebook must be trained before entries can be written.
    #[inline]
    pub fn is_quantized(self) -> bool {
        self != QuantScheme::NoQuantization
    }
}

impl TryFrom<i32> for QuantScheme {
    type Error = LmqError;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(QuantScheme::NoQuantization),
            1 => Ok(QuantScheme::Quant16),
            other => {
                tracing::error!(tag = other, "unsupported quantization scheme");
                Err(LmqError::UnsupportedScheme(other))
            }
        }
    }
}

/// Bits occupied by one middle-order entry (probability + backoff).
pub fn middle_entry_bits(scheme: QuantScheme) -> u8 {
    match scheme {
        QuantScheme::NoQuantization => NEG_FLOAT_BITS + FLOAT_BITS,
        QuantScheme::Quant16 => scheme.prob_bits() + scheme.backoff_bits(),
    }
}

/// Bits occupied by one longest-order entry (probability only).
pub fn longest_entry_bits(scheme: QuantScheme) -> u8 {
    match scheme {
        QuantScheme::NoQuantization => NEG_FLOAT_BITS,
        QuantScheme::Quant16 => scheme.prob_bits(),
    }
}

/// Number of `f32` centers a quantizer for a model of `max_order` holds.
///
/// Orders `2..max_order` carry a probability and a backoff table, the
/// longest order a single probability table. Unigrams are never quantized.
pub fn quant_floats(scheme: QuantScheme, max_order: usize) -> usize {
    if !scheme.is_quantized() {
        return 0;
    }
    let longest = 1usize << scheme.prob_bits();
    let middle = (1usize << scheme.backoff_bits()) + longest;
    max_order.saturating_sub(2) * middle + longest
}

/// Size in bytes of the quantizer blob for a model of `max_order`.
pub fn quant_size(scheme: QuantScheme, max_order: usize) -> usize {
    quant_floats(scheme, max_order) * core::mem::size_of::<f32>()
}
