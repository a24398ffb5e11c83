//! Axis deltas to cursor deltas
//!
//! The consumer-side mapping around the filter: x-axis angular velocity
//! turns the camera horizontally, y-axis vertically with an
//! inverted-pitch default, roll is not mapped. Inversion flags live
//! here, on the caller's side of the filter contract, never inside it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::bridge::InputBridge;
use crate::gyro::AxisHandlers;

/// Axis inversion flags applied while routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub invert_x: bool,
    #[serde(default)]
    pub invert_y: bool,
}

/// Builds the per-axis callbacks that feed an [`InputBridge`].
#[derive(Clone)]
pub struct DeltaRouter {
    bridge: Arc<dyn InputBridge>,
    config: RouterConfig,
}

impl DeltaRouter {
    pub fn new(bridge: Arc<dyn InputBridge>, config: RouterConfig) -> Self {
        Self { bridge, config }
    }

    /// Same bridge, different inversion flags.
    pub fn with_config(&self, config: RouterConfig) -> Self {
        Self {
            bridge: self.bridge.clone(),
            config,
        }
    }

    /// Fresh callbacks for one reader start.
    ///
    /// x: horizontal cursor delta, negated when invert_x is set.
    /// y: vertical cursor delta, negated by default (tilting the device
    ///    back looks up); invert_y restores the direct mapping.
    /// z: roll has no cursor meaning and is dropped.
    pub fn handlers(&self) -> AxisHandlers {
        let mut handlers = AxisHandlers::noop();

        let bridge = self.bridge.clone();
        let invert_x = self.config.invert_x;
        handlers.on_x = Box::new(move |delta| {
            let dx = if invert_x { -delta } else { delta };
            bridge.send_cursor_delta(dx, 0.0);
        });

        let bridge = self.bridge.clone();
        let invert_y = self.config.invert_y;
        handlers.on_y = Box::new(move |delta| {
            let dy = if invert_y { delta } else { -delta };
            bridge.send_cursor_delta(0.0, dy);
        });

        handlers
    }

    pub fn config(&self) -> RouterConfig {
        self.config
    }
}
