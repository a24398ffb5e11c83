//! Filter configuration snapshots
//!
//! A [`FilterConfig`] is immutable once handed to a reader; changing
//! anything means publishing a whole new snapshot, which rebuilds the
//! filter so no smoothing state leaks across the change.

use serde::{Deserialize, Serialize};

use crate::sensor::SampleRate;

/// Dead-zone threshold applied to filter output, rad/s.
pub const DEFAULT_THRESHOLD: f32 = 0.02;

/// Moving-average window in samples.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 4;

// Config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Smoothing window must hold at least one sample")]
    WindowTooSmall,

    #[error("Sensitivity must be positive and finite, got {0}")]
    InvalidSensitivity(f32),

    #[error("Threshold must be non-negative and finite, got {0}")]
    InvalidThreshold(f32),
}

/// One immutable configuration snapshot for the signal path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Delay-bucket hint forwarded to the sensor subsystem.
    #[serde(default)]
    pub sample_rate: SampleRate,

    /// Moving-average smoothing over the scaled samples.
    #[serde(default = "default_smoothing")]
    pub smoothing: bool,

    /// Smoothing window in samples; hard floor of 1.
    #[serde(default = "default_window")]
    pub smoothing_window: usize,

    /// Dead-zone threshold: an axis emits only when the magnitude of its
    /// output strictly exceeds this value.
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Linear multiplier applied to raw values before smoothing.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
}

fn default_smoothing() -> bool {
    true
}

fn default_window() -> usize {
    DEFAULT_SMOOTHING_WINDOW
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_sensitivity() -> f32 {
    1.0
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::default(),
            smoothing: default_smoothing(),
            smoothing_window: default_window(),
            threshold: default_threshold(),
            sensitivity: default_sensitivity(),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smoothing_window == 0 {
            return Err(ConfigError::WindowTooSmall);
        }
        if !self.sensitivity.is_finite() || self.sensitivity <= 0.0 {
            return Err(ConfigError::InvalidSensitivity(self.sensitivity));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = FilterConfig::default();
        assert_eq!(config.sample_rate, SampleRate::Game);
        assert!(config.smoothing);
        assert_eq!(config.smoothing_window, 4);
        assert_eq!(config.threshold, 0.02);
        assert_eq!(config.sensitivity, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = FilterConfig {
            smoothing_window: 0,
            ..FilterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WindowTooSmall)
        ));
    }

    #[test]
    fn non_finite_sensitivity_is_rejected() {
        let config = FilterConfig {
            sensitivity: f32::NAN,
            ..FilterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSensitivity(_))
        ));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let config = FilterConfig {
            threshold: -0.1,
            ..FilterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn window_of_one_is_allowed() {
        let config = FilterConfig {
            smoothing_window: 1,
            ..FilterConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
