//! gyroaim - gyroscope camera control for a game launcher surface
//!
//! Conditions raw angular velocity from a gyroscope-class sensor into
//! camera deltas for a game input bridge:
//!
//! ```text
//! SensorHub ──samples──► GyroReader ──[× sensitivity → smooth → gate]──► AxisHandlers
//!                                                                            │
//!                          AimSupervisor (engage/disengage)                  ▼
//!                                                                       DeltaRouter ──► InputBridge
//! ```
//!
//! 1. [`sensor`] - Sensor subsystem boundary and backends
//! 2. [`gyro`] - Signal filter and subscription lifecycle
//! 3. [`bridge`] - Input bridge boundary and delta routing
//! 4. [`control`] - Typed-event activation supervisor
//! 5. [`settings`] - TOML settings file surface
//!
//! The reader runs only while a gyroscope is present, gyro aiming is
//! enabled, and the game surface has the pointer grabbed; the
//! [`control::AimSupervisor`] owns that decision.

pub mod bridge;
pub mod control;
pub mod gyro;
pub mod sensor;
pub mod settings;

pub use bridge::{CursorMode, DeltaRouter, InputBridge, LogBridge, RouterConfig};
pub use control::{AimSupervisor, ControlEvent, SupervisorError};
pub use gyro::{
    AxisDeltas, AxisHandlers, ConfigError, FilterConfig, GyroFilter, GyroReaderHandle,
    ReaderError, SmoothingBuffer,
};
pub use sensor::{
    AngularSample, GamepadHub, SampleRate, SensorError, SensorHub, Subscription, SyntheticHub,
};
pub use settings::{AimSettings, SourceKind};
