//! Error types for quantizer construction and persistence.

use thiserror::Error;

use crate::scheme::QuantScheme;

/// Result type alias for quantizer operations.
pub type Result<T> = core::result::Result<T, LmqError>;

#[derive(Debug, Error)]
pub enum LmqError {
    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted scheme tag that names no known scheme.
    #[error("unsupported quantization scheme tag {0}")]
    UnsupportedScheme(i32),

    /// The scheme cannot lay out tables for a model of this order.
    #[error("{scheme:?} cannot quantize a model of order {order}")]
    InvalidOrder { scheme: QuantScheme, order: usize },

    /// An order with no table in this quantizer.
    #[error("order {order} has no quantization table (model order {max_order})")]
    OrderOutOfRange { order: usize, max_order: usize },

    /// Codebooks are sealed once every order is trained.
    #[error("order {order} trained after the quantizer was sealed")]
    AlreadyTrained { order: usize },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LmqError {
    /// Short stable label for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            LmqError::Io(_) => "io_error",
            LmqError::UnsupportedScheme(_) => "unsupported_scheme",
            LmqError::InvalidOrder { .. } => "invalid_order",
            LmqError::OrderOutOfRange { .. } => "order_out_of_range",
            LmqError::AlreadyTrained { .. } => "already_trained",
            LmqError::Config(_) => "config",
        }
    }
}

impl From<toml::de::Error> for LmqError {
    fn from(e: toml::de::Error) -> Self {
        LmqError::Config(e.to_string())
    }
}
