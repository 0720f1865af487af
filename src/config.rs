use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::burnside::BurnsideFormula;
use crate::group::Tolerance;

/// Above this many combinations, counting falls back to Burnside's lemma
pub const DEFAULT_ENUM_MAX: u64 = 30_000_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings governing enumeration and counting
///
/// Missing keys take their default values:
///
/// ```
/// # use orbitcount::config::{EnumerationConfig, DEFAULT_ENUM_MAX};
/// # use orbitcount::burnside::BurnsideFormula;
/// let config = EnumerationConfig::from_toml_str(r#"
///     workers = 4
///     formula = "legacy_cycle_count"
///
///     [tolerance]
///     absolute = 1e-6
/// "#).unwrap();
/// assert_eq!(config.enum_max, DEFAULT_ENUM_MAX);
/// assert_eq!(config.workers, Some(4));
/// assert_eq!(config.formula, BurnsideFormula::LegacyCycleCount);
/// assert_eq!(config.tolerance.relative, 1e-5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumerationConfig {
    /// Largest C(N, k) that is enumerated explicitly
    pub enum_max: u64,
    /// Worker threads for enumeration, all available if unset
    pub workers: Option<usize>,
    /// Coordinate matching tolerance for deriving permutations
    pub tolerance: Tolerance,
    pub formula: BurnsideFormula
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        EnumerationConfig {
            enum_max: DEFAULT_ENUM_MAX,
            workers: None,
            tolerance: Tolerance::default(),
            formula: BurnsideFormula::default()
        }
    }
}

impl EnumerationConfig {
    pub fn from_toml_str(contents: &str) -> Result<EnumerationConfig, ConfigError> {
        let config: EnumerationConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<EnumerationConfig, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be positive".into()));
        }

        let Tolerance {absolute, relative} = self.tolerance;
        if !(absolute >= 0.0 && relative >= 0.0) || !(absolute.is_finite() && relative.is_finite()) {
            return Err(ConfigError::Invalid(format!("tolerances must be finite and non-negative, got {} and {}", absolute, relative)));
        }

        Ok(())
    }
}
