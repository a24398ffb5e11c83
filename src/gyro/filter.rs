//! Per-sample signal path: scale, smooth, gate

use crate::gyro::config::FilterConfig;
use crate::gyro::smoothing::SmoothingBuffer;
use crate::sensor::AngularSample;

/// Outcome of one filter step, per axis. `None` means the dead-zone gate
/// suppressed that axis; a callback never sees a zero delta.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisDeltas {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl AxisDeltas {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }
}

/// The gyroscope signal filter.
///
/// One instance lives on one reader task; it holds no locks and does a
/// handful of multiplications per sample. Malformed input (NaN and
/// friends) is not defended against, whatever falls out of the arithmetic
/// propagates.
#[derive(Debug)]
pub struct GyroFilter {
    sensitivity: f32,
    threshold: f32,
    smoothing: Option<SmoothingBuffer>,
}

impl GyroFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            sensitivity: config.sensitivity,
            threshold: config.threshold,
            smoothing: config
                .smoothing
                .then(|| SmoothingBuffer::new(config.smoothing_window)),
        }
    }

    /// Runs one sample through scale -> smooth -> gate.
    ///
    /// Axes are independent. With smoothing disabled the output is exactly
    /// `input * sensitivity`. The gate emits only values whose magnitude
    /// strictly exceeds the threshold.
    pub fn apply(&mut self, sample: &AngularSample) -> AxisDeltas {
        let scaled = [
            sample.x * self.sensitivity,
            sample.y * self.sensitivity,
            sample.z * self.sensitivity,
        ];

        let output = match &mut self.smoothing {
            Some(buffer) => buffer.push(scaled),
            None => scaled,
        };

        AxisDeltas {
            x: self.gate(output[0]),
            y: self.gate(output[1]),
            z: self.gate(output[2]),
        }
    }

    fn gate(&self, value: f32) -> Option<f32> {
        (value.abs() > self.threshold).then_some(value)
    }

    /// Drops accumulated smoothing history.
    pub fn reset(&mut self) {
        if let Some(buffer) = &mut self.smoothing {
            buffer.clear();
        }
    }

    /// Applies to the next sample; smoothing history stays intact.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Applies to the next sample without a reset. Sensitivity scales
    /// values before they enter the buffer, so samples scaled under the
    /// old value keep influencing the average for up to one window
    /// length. Accepted transient, kept as-is.
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity;
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }
}
