//! Deterministic software sensor for demos and lifecycle testing
//!
//! Three delivery modes: a sine/cosine waveform for watching the pipeline
//! move, replay of a fixed sample list paced by the rate hint, and a
//! manual mode where the caller pushes samples through a [`SampleFeed`].
//! An `absent` construction reports no gyroscope at all, covering the
//! availability-gated paths without hardware.

use chrono::Local;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::sensor::{AngularSample, SampleRate, SensorError, SensorHub, Subscription};

// One registered subscriber: its channel plus the cancellation token the
// owning Subscription guard trips on drop.
#[derive(Debug)]
struct Outlet {
    id: u64,
    tx: mpsc::Sender<AngularSample>,
    token: CancellationToken,
}

type Registry = Arc<Mutex<Vec<Outlet>>>;

fn lock_registry(registry: &Registry) -> MutexGuard<'_, Vec<Outlet>> {
    match registry.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug, Clone)]
enum SyntheticMode {
    Wave { amplitude: f32, period: Duration },
    Replay { samples: Vec<[f32; 3]> },
    Manual,
}

/// Software gyroscope source.
#[derive(Debug)]
pub struct SyntheticHub {
    mode: SyntheticMode,
    present: bool,
    registry: Registry,
    next_id: AtomicU64,
}

impl SyntheticHub {
    /// Continuous waveform: x swings as a sine of `amplitude` rad/s over
    /// `period`, y follows at half amplitude, z stays quiet.
    pub fn wave(amplitude: f32, period: Duration) -> Self {
        Self::with_mode(SyntheticMode::Wave { amplitude, period }, true)
    }

    /// Plays `samples` in order at the requested rate, then keeps the
    /// subscription open (quiet sensor) until cancelled.
    pub fn replay(samples: Vec<[f32; 3]>) -> Self {
        Self::with_mode(SyntheticMode::Replay { samples }, true)
    }

    /// Caller-paced delivery through the returned [`SampleFeed`].
    pub fn manual() -> (Self, SampleFeed) {
        let hub = Self::with_mode(SyntheticMode::Manual, true);
        let feed = SampleFeed {
            registry: hub.registry.clone(),
        };
        (hub, feed)
    }

    /// Reports no gyroscope; every subscribe attempt fails.
    pub fn absent() -> Self {
        Self::with_mode(SyntheticMode::Manual, false)
    }

    fn with_mode(mode: SyntheticMode, present: bool) -> Self {
        Self {
            mode,
            present,
            registry: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscriptions whose guard is still alive. Cancelled entries are
    /// pruned on the way through, so teardown is observable immediately.
    pub fn active_subscriptions(&self) -> usize {
        let mut outlets = lock_registry(&self.registry);
        outlets.retain(|o| !o.token.is_cancelled());
        outlets.len()
    }
}

impl SensorHub for SyntheticHub {
    fn has_gyroscope(&self) -> bool {
        self.present
    }

    fn subscribe(
        &self,
        rate: SampleRate,
        tx: mpsc::Sender<AngularSample>,
    ) -> Result<Subscription, SensorError> {
        if !self.present {
            return Err(SensorError::NoGyroscope);
        }

        let token = CancellationToken::new();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock_registry(&self.registry).push(Outlet {
            id,
            tx: tx.clone(),
            token: token.clone(),
        });

        match &self.mode {
            SyntheticMode::Wave { amplitude, period } => {
                spawn_wave(*amplitude, *period, rate, tx, token.clone());
            }
            SyntheticMode::Replay { samples } => {
                spawn_replay(samples.clone(), rate, tx, token.clone());
            }
            SyntheticMode::Manual => {
                // Delivery is driven by the SampleFeed, nothing to spawn.
            }
        }

        info!("Sensor subscription started: {} at {:?}", self.name(), rate);
        Ok(Subscription::new(token))
    }

    fn name(&self) -> &str {
        match self.mode {
            SyntheticMode::Wave { .. } => "synthetic-wave",
            SyntheticMode::Replay { .. } => "synthetic-replay",
            SyntheticMode::Manual if self.present => "synthetic-manual",
            SyntheticMode::Manual => "synthetic-absent",
        }
    }
}

fn spawn_wave(
    amplitude: f32,
    period: Duration,
    rate: SampleRate,
    tx: mpsc::Sender<AngularSample>,
    token: CancellationToken,
) {
    let period_secs = period.as_secs_f32().max(0.001);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(rate.interval());
        let started = tokio::time::Instant::now();

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Wave delivery cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let t = started.elapsed().as_secs_f32();
                    let phase = std::f32::consts::TAU * t / period_secs;
                    let sample = AngularSample {
                        x: amplitude * phase.sin(),
                        y: 0.5 * amplitude * phase.cos(),
                        z: 0.0,
                        timestamp: Local::now(),
                    };
                    if tx.send(sample).await.is_err() {
                        debug!("Wave receiver closed, stopping delivery");
                        break;
                    }
                }
            }
        }
    });
}

fn spawn_replay(
    samples: Vec<[f32; 3]>,
    rate: SampleRate,
    tx: mpsc::Sender<AngularSample>,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(rate.interval());

        for values in samples {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Replay delivery cancelled");
                    return;
                }
                _ = interval.tick() => {
                    let sample = AngularSample::new(values[0], values[1], values[2]);
                    if tx.send(sample).await.is_err() {
                        debug!("Replay receiver closed, stopping delivery");
                        return;
                    }
                }
            }
        }

        debug!("Replay exhausted, holding subscription open");
        // Keep tx alive so the stream stays open like a quiet sensor would.
        token.cancelled().await;
    });
}

/// Push handle for [`SyntheticHub::manual`] hubs.
#[derive(Debug, Clone)]
pub struct SampleFeed {
    registry: Registry,
}

impl SampleFeed {
    /// Delivers one sample to every live subscriber; returns how many
    /// accepted it. Dead or cancelled subscribers are pruned.
    pub async fn push(&self, x: f32, y: f32, z: f32) -> usize {
        let live: Vec<(u64, mpsc::Sender<AngularSample>)> = {
            let mut outlets = lock_registry(&self.registry);
            outlets.retain(|o| !o.token.is_cancelled());
            outlets.iter().map(|o| (o.id, o.tx.clone())).collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in live {
            if tx.send(AngularSample::new(x, y, z)).await.is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            lock_registry(&self.registry).retain(|o| !dead.contains(&o.id));
        }
        delivered
    }
}
