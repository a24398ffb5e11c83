//! Activation control for gyro aiming
//!
//! "Should the gyro steer the camera right now" depends on three inputs:
//! a gyroscope is present, the user enabled the feature, and the game
//! surface has the pointer grabbed. [`AimSupervisor`] keeps that state
//! explicit: typed [`ControlEvent`]s flow in, reader engage/disengage
//! comes out. No ambient settings lookups, no recomputation on the fly.

pub mod supervisor;

pub use supervisor::{AimSupervisor, SupervisorError};

use crate::bridge::{CursorMode, RouterConfig};
use crate::gyro::FilterConfig;

/// Everything that can change the supervisor's mind.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    /// The surface grabbed or released the pointer.
    CursorMode(CursorMode),

    /// The user toggled gyro aiming.
    GyroEnabled(bool),

    /// A new filter snapshot, forwarded to a running reader.
    ConfigChanged(FilterConfig),

    /// New inversion flags; a running reader restarts with new routing.
    Routing(RouterConfig),

    /// Tear down and exit.
    Shutdown,
}
