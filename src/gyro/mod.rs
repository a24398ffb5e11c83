//! Gyroscope signal subsystem
//!
//! Conditions raw angular velocity into camera-ready deltas:
//!
//! 1. [`config`] - Immutable filter snapshots and validation
//! 2. [`smoothing`] - Circular history with incremental running sums
//! 3. [`filter`] - Per-sample scale -> smooth -> gate pipeline
//! 4. [`reader`] - Subscription lifecycle and the per-axis callbacks
//!
//! # Architecture
//!
//! ```text
//! AngularSample ──► [× sensitivity] ──► [moving average] ──► [dead zone] ──► AxisDeltas
//!                                        (optional)           (|v| > threshold)
//! ```
//!
//! The whole path runs on one reader task; nothing here locks.

pub mod config;
pub mod filter;
pub mod reader;
pub mod smoothing;

pub use config::{ConfigError, FilterConfig, DEFAULT_SMOOTHING_WINDOW, DEFAULT_THRESHOLD};
pub use filter::{AxisDeltas, GyroFilter};
pub use reader::{AxisHandler, AxisHandlers, GyroReaderHandle, ReaderError, ReaderState};
pub use smoothing::SmoothingBuffer;
