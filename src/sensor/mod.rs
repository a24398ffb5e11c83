//! Sensor subsystem boundary for gyroscope-class input sources
//!
//! Everything upstream of the signal filter lives behind [`SensorHub`]:
//!
//! 1. [`synthetic`] - Deterministic software source (waveform, replay, manual feed)
//! 2. [`gamepad`] - gilrs-backed desktop stand-in (stick deflection as angular rate)
//!
//! # Architecture
//!
//! ```text
//! Backend ──► mpsc::Sender<AngularSample> ──► reader task
//!    ▲
//!    └── Subscription (cancel on drop)
//! ```
//!
//! Availability is a plain boolean, not an error: a machine without a
//! gyroscope is a valid state and callers are expected to check
//! [`SensorHub::has_gyroscope`] before subscribing.

pub mod gamepad;
pub mod synthetic;

pub use gamepad::GamepadHub;
pub use synthetic::{SampleFeed, SyntheticHub};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One 3-axis angular velocity reading in rad/s, platform axis convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub timestamp: DateTime<Local>,
}

impl AngularSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            timestamp: Local::now(),
        }
    }

    /// Axis values in x, y, z order.
    pub fn values(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Requested sample delivery rate, mirroring the delay buckets mobile
/// sensor APIs expose. Backends treat this as a hint, not a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRate {
    /// As fast as the backend can deliver.
    Fastest,
    /// ~20ms, suited to camera control.
    Game,
    /// ~66ms, suited to UI effects.
    Ui,
    /// ~200ms, background use.
    Normal,
    /// Explicit interval in milliseconds (floor 1ms).
    CustomMs(u64),
}

impl SampleRate {
    /// Concrete pacing interval for software backends.
    pub fn interval(&self) -> Duration {
        match self {
            SampleRate::Fastest => Duration::from_millis(5),
            SampleRate::Game => Duration::from_millis(20),
            SampleRate::Ui => Duration::from_millis(66),
            SampleRate::Normal => Duration::from_millis(200),
            SampleRate::CustomMs(ms) => Duration::from_millis((*ms).max(1)),
        }
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate::Game
    }
}

// Sensor errors
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Failed to initialize sensor backend: {0}")]
    InitializationError(String),

    #[error("No gyroscope-class sensor present")]
    NoGyroscope,

    #[error("Failed to deliver sample: {0}")]
    DeliveryError(String),
}

/// Live sample delivery, cancelled when this guard is dropped.
///
/// Held by whoever started the subscription; dropping it (or calling
/// [`Subscription::unsubscribe`]) stops the backend task. Backends create
/// one via [`Subscription::new`] with the token their delivery loop
/// watches.
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
}

impl Subscription {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Explicit teardown; equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A handle to the platform's sensor subsystem.
///
/// Implementations enumerate a gyroscope-class sensor, deliver 3-axis
/// samples into a caller-provided channel at a requested rate, and stop
/// delivery when the returned [`Subscription`] goes away.
pub trait SensorHub: Send + Sync + 'static {
    /// True iff a gyroscope-class sensor can be enumerated right now.
    ///
    /// Pure and cheap; callable repeatedly. Absence is not an error.
    fn has_gyroscope(&self) -> bool;

    /// Start delivering samples into `tx` at roughly `rate`.
    ///
    /// Fails when no sensor is present; checking [`Self::has_gyroscope`]
    /// first is the caller's job. Delivery stops when the subscription is
    /// dropped or when `tx`'s receiver closes.
    fn subscribe(
        &self,
        rate: SampleRate,
        tx: mpsc::Sender<AngularSample>,
    ) -> Result<Subscription, SensorError>;

    /// Backend name for log lines.
    fn name(&self) -> &str;
}
