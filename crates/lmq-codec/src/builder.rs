use lmq_core::{QuantConfig, QuantScheme, Result};

use crate::quantizer::Quantizer;

/// Builds a [`Quantizer`] from configuration plus per-build overrides.
#[derive(Debug, Clone, Default)]
pub struct QuantizerBuilder {
    pub config: QuantConfig,
}

impl QuantizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: QuantConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scheme(mut self, scheme: QuantScheme) -> Self {
        self.config.scheme = scheme;
        self
    }

    pub fn max_order(mut self, max_order: usize) -> Self {
        self.config.max_order = max_order;
        self
    }

    /// Allocates the untrained quantizer.
    pub fn build(self) -> Result<Quantizer> {
        Quantizer::new(self.config.scheme, self.config.max_order)
    }
}
