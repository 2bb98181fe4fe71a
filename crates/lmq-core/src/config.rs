use serde::Deserialize;

use crate::error::Result;
use crate::scheme::QuantScheme;

/// Quantizer settings as read from a model-build configuration file.
///
/// ```toml
/// scheme = "quant16"
/// max_order = 3
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct QuantConfig {
    pub scheme: QuantScheme,
    pub max_order: usize,
}

impl Default for QuantConfig {
    fn default() -> Self {
        Self {
            scheme: QuantScheme::Quant16,
            max_order: 3,
        }
    }
}

impl QuantConfig {
    /// Parses a TOML document; missing keys fall back to the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmqError;

    #[test]
    fn test_parse_full_config() {
        let cfg = QuantConfig::from_toml_str("scheme = \"none\"\nmax_order = 5\n").unwrap();
        assert_eq!(cfg.scheme, QuantScheme::NoQuantization);
        assert_eq!(cfg.max_order, 5);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let cfg = QuantConfig::from_toml_str("max_order = 4").unwrap();
        assert_eq!(cfg.scheme, QuantScheme::Quant16);
        assert_eq!(cfg.max_order, 4);
        assert_eq!(QuantConfig::from_toml_str("").unwrap(), QuantConfig::default());
    }

    #[test]
    fn test_unknown_scheme_is_config_error() {
        let err = QuantConfig::from_toml_str("scheme = \"quant8\"").unwrap_err();
        assert!(matches!(err, LmqError::Config(_)));
    }
}
