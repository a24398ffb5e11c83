//! Game input bridge boundary
//!
//! Filtered deltas leave the crate through [`InputBridge::send_cursor_delta`],
//! the same entry point the pointer path uses on the launcher side. What
//! happens beyond that call (native surface, remote process) is not this
//! crate's business.

pub mod router;

pub use router::{DeltaRouter, RouterConfig};

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Whether the game surface has captured the pointer.
///
/// Gyro aiming only makes sense in camera mode; a free cursor means the
/// player is in menus or HUD interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    Grabbed,
    Free,
}

/// Receives camera deltas. Implementations must not block: calls arrive
/// on the reader task between samples.
pub trait InputBridge: Send + Sync {
    fn send_cursor_delta(&self, dx: f32, dy: f32);
}

/// Demo bridge that logs deltas and counts them.
#[derive(Debug, Default)]
pub struct LogBridge {
    sent: AtomicU64,
}

impl LogBridge {
    pub fn deltas_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl InputBridge for LogBridge {
    fn send_cursor_delta(&self, dx: f32, dy: f32) {
        let count = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Cursor delta #{}: ({:+.4}, {:+.4})", count, dx, dy);
    }
}
