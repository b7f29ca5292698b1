//! Training hyperparameters, loadable from TOML
//!
//! ```toml
//! epochs = 30
//! minibatch_size = 10
//! learning_rate = 0.1
//! decay_rate = 5.0
//! validation_fraction = 0.1666
//! ```
//!
//! Missing keys fall back to [`TrainingConfig::default`]; unknown keys are
//! rejected.

use crate::error::{Result, TesseraError};
use crate::nn::optim::Sgd;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub minibatch_size: usize,
    pub learning_rate: f32,
    /// L2 weight decay, scaled by the training set size in the update
    pub decay_rate: f32,
    /// Trailing share of the data held out for evaluation
    pub validation_fraction: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 30,
            minibatch_size: 10,
            learning_rate: 0.1,
            decay_rate: 0.0,
            validation_fraction: 1.0 / 6.0,
        }
    }
}

impl TrainingConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// `Serialization` on malformed TOML, `Configuration` on invalid values
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| TesseraError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`Self::from_toml_str`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    /// `Serialization` if the config cannot be rendered
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| TesseraError::Serialization(e.to_string()))
    }

    /// # Errors
    /// `Configuration` naming the first offending field
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TesseraError::Configuration("epochs must be positive".to_string()));
        }
        if self.minibatch_size == 0 {
            return Err(TesseraError::Configuration(
                "minibatch_size must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(TesseraError::Configuration(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(self.decay_rate >= 0.0 && self.decay_rate.is_finite()) {
            return Err(TesseraError::Configuration(format!(
                "decay_rate must be non-negative, got {}",
                self.decay_rate
            )));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(TesseraError::Configuration(format!(
                "validation_fraction must lie in [0, 1), got {}",
                self.validation_fraction
            )));
        }
        Ok(())
    }

    /// Number of samples held out for evaluation out of `total`
    #[must_use]
    pub fn validation_size(&self, total: usize) -> usize {
        ((total as f64) * self.validation_fraction).round() as usize
    }

    /// SGD optimizer for a training set of `training_size` samples
    ///
    /// # Errors
    /// `Configuration` if `training_size` is zero
    pub fn optimizer(&self, training_size: usize) -> Result<Sgd> {
        Sgd::new(
            self.minibatch_size,
            training_size,
            self.decay_rate,
            self.learning_rate,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = TrainingConfig::from_toml_str("epochs = 3\nlearning_rate = 0.5\n").unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.learning_rate, 0.5);
        assert_eq!(config.minibatch_size, TrainingConfig::default().minibatch_size);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            TrainingConfig::from_toml_str("epochz = 3"),
            Err(TesseraError::Serialization(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for doc in [
            "epochs = 0",
            "minibatch_size = 0",
            "learning_rate = -0.1",
            "decay_rate = -1.0",
            "validation_fraction = 1.0",
        ] {
            assert!(
                matches!(TrainingConfig::from_toml_str(doc), Err(TesseraError::Configuration(_))),
                "{doc} should be rejected"
            );
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = TrainingConfig {
            epochs: 2,
            minibatch_size: 4,
            learning_rate: 0.25,
            decay_rate: 5.0,
            validation_fraction: 0.5,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(TrainingConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_validation_size_and_optimizer() {
        let config = TrainingConfig::default();
        assert_eq!(config.validation_size(60), 10);
        assert_eq!(config.validation_size(0), 0);
        assert_eq!(config.optimizer(50).unwrap().minibatch_size(), 10);
        assert!(config.optimizer(0).is_err());
    }
}
