//! TOML settings file for the gyro aim pipeline
//!
//! One file, read at startup: `~/.config/gyroaim/settings.toml`. A
//! missing file is written out with defaults; an unreadable or
//! unparsable one is warned about and replaced by defaults in memory.
//! Slider-range fields are clamped to the settings surface rather than
//! rejected, so a hand-edited file cannot brick the pipeline.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::bridge::RouterConfig;
use crate::gyro::config::{DEFAULT_SMOOTHING_WINDOW, DEFAULT_THRESHOLD};
use crate::gyro::FilterConfig;
use crate::sensor::SampleRate;

const CONFIG_DIR: &str = ".config/gyroaim";
const SETTINGS_FILE: &str = "settings.toml";

/// Sensitivity slider range, percent.
const SENSITIVITY_PERCENT_RANGE: (f32, f32) = (25.0, 300.0);
/// Smoothing window slider range, samples.
const SMOOTHING_WINDOW_RANGE: (usize, usize) = (2, 10);
/// Custom sample interval slider range, milliseconds.
const CUSTOM_MS_RANGE: (u64, u64) = (5, 50);

/// Which sensor backend the demo binary builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Synthetic,
    Gamepad,
}

/// The gyro aiming settings surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimSettings {
    /// Master switch for gyro aiming.
    #[serde(default)]
    pub enabled: bool,

    /// Sensitivity in percent; the filter receives this divided by 100.
    #[serde(default = "default_sensitivity_percent")]
    pub sensitivity_percent: f32,

    /// Delivery rate hint for the sensor subsystem.
    #[serde(default)]
    pub sample_rate: SampleRate,

    /// Moving-average smoothing on or off.
    #[serde(default = "default_smoothing")]
    pub smoothing: bool,

    /// Smoothing window in samples.
    #[serde(default = "default_window")]
    pub smoothing_window: usize,

    /// Dead-zone threshold. Not on the settings screen, but carried in
    /// the file for people who want to tune it.
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Flip the horizontal camera direction.
    #[serde(default)]
    pub invert_x: bool,

    /// Flip the vertical camera direction.
    #[serde(default)]
    pub invert_y: bool,

    /// Sensor backend for the demo binary.
    #[serde(default = "default_source")]
    pub source: SourceKind,
}

fn default_sensitivity_percent() -> f32 {
    100.0
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

fn default_source() -> SourceKind {
    SourceKind::Synthetic
}

impl Default for AimSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            sensitivity_percent: default_sensitivity_percent(),
            sample_rate: SampleRate::default(),
            smoothing: default_smoothing(),
            smoothing_window: default_window(),
            threshold: default_threshold(),
            invert_x: false,
            invert_y: false,
            source: default_source(),
        }
    }
}

impl AimSettings {
    /// Reads the settings file, writing a default one when none exists.
    /// Read or parse failures fall back to defaults with a warning.
    pub async fn load_or_default() -> Result<Self> {
        let path = settings_path();

        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            info!("No settings file at {}, writing defaults", path.display());
            let defaults = Self::default();
            defaults.save().await?;
            return Ok(defaults);
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                return Ok(Self::default());
            }
        };

        match toml::from_str(&content) {
            Ok(settings) => {
                info!("Settings loaded from {}", path.display());
                Ok(settings)
            }
            Err(e) => {
                warn!("Failed to parse settings file: {}, using defaults", e);
                Ok(Self::default())
            }
        }
    }

    pub async fn save(&self) -> Result<()> {
        let path = settings_path();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize settings: {}", e))?;

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| eyre!("Failed to write settings file: {}", e))?;

        info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Coerces slider-range fields into the settings surface ranges.
    /// Named rate buckets pass through untouched; a custom interval is
    /// clamped to the 5..=50ms the slider offers.
    pub fn clamped(mut self) -> Self {
        self.sensitivity_percent = self
            .sensitivity_percent
            .clamp(SENSITIVITY_PERCENT_RANGE.0, SENSITIVITY_PERCENT_RANGE.1);
        self.smoothing_window = self
            .smoothing_window
            .clamp(SMOOTHING_WINDOW_RANGE.0, SMOOTHING_WINDOW_RANGE.1);
        self.threshold = self.threshold.max(0.0);
        if let SampleRate::CustomMs(ms) = self.sample_rate {
            self.sample_rate = SampleRate::CustomMs(ms.clamp(CUSTOM_MS_RANGE.0, CUSTOM_MS_RANGE.1));
        }
        self
    }

    /// Filter snapshot for these settings. Percent becomes the linear
    /// multiplier here, nowhere else.
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            sample_rate: self.sample_rate,
            smoothing: self.smoothing,
            smoothing_window: self.smoothing_window,
            threshold: self.threshold,
            sensitivity: self.sensitivity_percent / 100.0,
        }
    }

    pub fn routing(&self) -> RouterConfig {
        RouterConfig {
            invert_x: self.invert_x,
            invert_y: self.invert_y,
        }
    }
}

pub fn settings_path() -> PathBuf {
    let mut path = home_dir();
    path.push(CONFIG_DIR);
    path.push(SETTINGS_FILE);
    path
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_settings_surface() {
        let settings = AimSettings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.sensitivity_percent, 100.0);
        assert_eq!(settings.sample_rate, SampleRate::Game);
        assert!(settings.smoothing);
        assert_eq!(settings.smoothing_window, 4);
        assert_eq!(settings.threshold, 0.02);
        assert!(!settings.invert_x);
        assert!(!settings.invert_y);
        assert_eq!(settings.source, SourceKind::Synthetic);
    }

    #[test]
    fn clamping_coerces_slider_ranges() {
        let settings = AimSettings {
            sensitivity_percent: 500.0,
            smoothing_window: 1,
            threshold: -0.5,
            sample_rate: SampleRate::CustomMs(500),
            ..AimSettings::default()
        }
        .clamped();

        assert_eq!(settings.sensitivity_percent, 300.0);
        assert_eq!(settings.smoothing_window, 2);
        assert_eq!(settings.threshold, 0.0);
        assert_eq!(settings.sample_rate, SampleRate::CustomMs(50));

        let settings = AimSettings {
            sensitivity_percent: 10.0,
            smoothing_window: 20,
            sample_rate: SampleRate::CustomMs(1),
            ..AimSettings::default()
        }
        .clamped();

        assert_eq!(settings.sensitivity_percent, 25.0);
        assert_eq!(settings.smoothing_window, 10);
        assert_eq!(settings.sample_rate, SampleRate::CustomMs(5));
    }

    #[test]
    fn named_rate_buckets_are_not_clamped() {
        let settings = AimSettings {
            sample_rate: SampleRate::Fastest,
            ..AimSettings::default()
        }
        .clamped();
        assert_eq!(settings.sample_rate, SampleRate::Fastest);
    }

    #[test]
    fn filter_config_divides_percent_by_hundred() {
        let settings = AimSettings {
            sensitivity_percent: 150.0,
            ..AimSettings::default()
        };
        let config = settings.filter_config();
        assert_eq!(config.sensitivity, 1.5);
        assert_eq!(config.smoothing_window, settings.smoothing_window);
        assert_eq!(config.threshold, settings.threshold);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn routing_carries_the_inversion_flags() {
        let settings = AimSettings {
            invert_x: true,
            ..AimSettings::default()
        };
        let routing = settings.routing();
        assert!(routing.invert_x);
        assert!(!routing.invert_y);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let settings: AimSettings =
            toml::from_str("enabled = true\nsource = \"gamepad\"").unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.source, SourceKind::Gamepad);
        assert_eq!(settings.sensitivity_percent, 100.0);
        assert_eq!(settings.smoothing_window, 4);
    }

    #[test]
    fn default_settings_round_trip_through_toml() {
        let settings = AimSettings::default();
        let content = toml::to_string_pretty(&settings).unwrap();
        let parsed: AimSettings = toml::from_str(&content).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn custom_rate_round_trips_through_toml() {
        let settings = AimSettings {
            sample_rate: SampleRate::CustomMs(30),
            ..AimSettings::default()
        };
        let content = toml::to_string_pretty(&settings).unwrap();
        let parsed: AimSettings = toml::from_str(&content).unwrap();
        assert_eq!(parsed.sample_rate, SampleRate::CustomMs(30));
    }
}
