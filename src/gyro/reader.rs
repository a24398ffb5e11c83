//! Subscription lifecycle around the signal filter
//!
//! A reader owns exactly one sensor subscription and pumps its samples
//! through a [`GyroFilter`] into per-axis callbacks. The lifecycle is a
//! statum state machine driven by a tokio task.
//!
//! # State Machine
//!
//! ```text
//! Idle ──subscribe──► Listening ──unsubscribe──► Idle
//!                        │  ▲
//!                        └──┘ (config snapshot change: unsubscribe,
//!                              rebuild filter, resubscribe)
//! ```
//!
//! # Architecture
//!
//! ```text
//! SensorHub ──mpsc──► select loop ──► GyroFilter ──► AxisHandlers
//!                        ▲   ▲
//!                 watch config  oneshot shutdown
//! ```
//!
//! All sample processing happens on the reader task, one sample at a
//! time; the filter never needs a lock. Lifecycle edges (start, config
//! change, stop) cannot race sample delivery because they either run
//! before the task exists, on the task itself, or after it has joined.

use statum::{machine, state};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::gyro::config::{ConfigError, FilterConfig};
use crate::gyro::filter::{AxisDeltas, GyroFilter};
use crate::sensor::{AngularSample, SensorError, SensorHub, Subscription};

/// Sample queue depth between a sensor backend and the reader task.
const SAMPLE_QUEUE_DEPTH: usize = 100;

/// Per-axis delta callback. Runs on the reader task; must not block.
pub type AxisHandler = Box<dyn FnMut(f32) + Send>;

/// The three independent per-axis callbacks fed by a reader.
pub struct AxisHandlers {
    pub on_x: AxisHandler,
    pub on_y: AxisHandler,
    pub on_z: AxisHandler,
}

impl AxisHandlers {
    /// All axes discard their deltas; callers opt in per axis.
    pub fn noop() -> Self {
        Self {
            on_x: Box::new(|_| {}),
            on_y: Box::new(|_| {}),
            on_z: Box::new(|_| {}),
        }
    }

    /// At most one call per axis per sample, never with a suppressed
    /// value.
    pub fn dispatch(&mut self, deltas: &AxisDeltas) {
        if let Some(delta) = deltas.x {
            (self.on_x)(delta);
        }
        if let Some(delta) = deltas.y {
            (self.on_y)(delta);
        }
        if let Some(delta) = deltas.z {
            (self.on_z)(delta);
        }
    }
}

impl std::fmt::Debug for AxisHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisHandlers").finish_non_exhaustive()
    }
}

// Reader errors
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Invalid filter config: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Sensor subsystem error: {0}")]
    SensorError(#[from] SensorError),

    #[error("Sample stream unavailable: {0}")]
    StreamError(String),

    #[error("Reader task failed: {0}")]
    TaskError(String),
}

/// Why the listening loop handed control back.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LoopEvent {
    Shutdown,
    ConfigChanged,
    SourceClosed,
}

/// States for the reader lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum ReaderState {
    Idle,      // No subscription, nothing flows
    Listening, // Subscription active, samples flowing
}

#[machine]
pub struct GyroReader<S: ReaderState> {
    hub: Arc<dyn SensorHub>,
    config: FilterConfig,
    filter: GyroFilter,
    handlers: AxisHandlers,
    config_rx: watch::Receiver<FilterConfig>,
    sample_rx: Option<mpsc::Receiver<AngularSample>>,
    subscription: Option<Subscription>,
}

impl<S: ReaderState> GyroReader<S> {
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

impl GyroReader<Idle> {
    fn create(
        hub: Arc<dyn SensorHub>,
        config: FilterConfig,
        handlers: AxisHandlers,
        config_rx: watch::Receiver<FilterConfig>,
    ) -> Self {
        debug!("Creating gyro reader with config: {:?}", config);
        let filter = GyroFilter::new(&config);
        Self::new(hub, config, filter, handlers, config_rx, None, None)
    }

    /// Subscribes and transitions to Listening.
    ///
    /// Filter state is reset first, so no sample can ever meet history
    /// from an earlier subscription. Sensor absence surfaces here.
    fn subscribe(mut self) -> Result<GyroReader<Listening>, ReaderError> {
        let (tx, rx) = mpsc::channel(SAMPLE_QUEUE_DEPTH);
        let subscription = self.hub.subscribe(self.config.sample_rate, tx)?;

        self.subscription = Some(subscription);
        self.sample_rx = Some(rx);
        self.filter.reset();

        info!(
            "Gyro reader listening on {} at {:?}",
            self.hub.name(),
            self.config.sample_rate
        );
        Ok(self.transition())
    }

    /// Adopts the latest config snapshot and rebuilds the filter, which
    /// reallocates the smoothing buffer and zeroes its sums.
    fn adopt_config(&mut self) {
        let config = self.config_rx.borrow_and_update().clone();
        debug!("Adopting config snapshot: {:?}", config);
        self.filter = GyroFilter::new(&config);
        self.config = config;
    }
}

impl GyroReader<Listening> {
    /// Pumps samples through the filter until shutdown, a config change,
    /// or the backend closing the stream. Hands the machine back so the
    /// task loop can decide what follows.
    async fn run_until_event(
        mut self,
        shutdown_rx: &mut oneshot::Receiver<()>,
    ) -> Result<(Self, LoopEvent), ReaderError> {
        let mut sample_rx = self.sample_rx.take().ok_or_else(|| {
            ReaderError::StreamError("listening reader lost its sample stream".to_string())
        })?;

        let mut samples_seen: u64 = 0;
        let mut deltas_emitted: u64 = 0;
        let mut last_log_time = chrono::Local::now();
        let log_interval = chrono::Duration::seconds(30);

        let event = loop {
            tokio::select! {
                _ = &mut *shutdown_rx => {
                    debug!("Shutdown signal received");
                    break LoopEvent::Shutdown;
                }

                changed = self.config_rx.changed() => {
                    match changed {
                        Ok(()) => break LoopEvent::ConfigChanged,
                        // Handle gone; treat as shutdown.
                        Err(_) => break LoopEvent::Shutdown,
                    }
                }

                sample = sample_rx.recv() => {
                    match sample {
                        Some(sample) => {
                            samples_seen += 1;
                            let deltas = self.filter.apply(&sample);
                            if !deltas.is_empty() {
                                deltas_emitted += 1;
                            }
                            self.handlers.dispatch(&deltas);
                        }
                        None => {
                            warn!("Sample stream closed by the sensor backend");
                            break LoopEvent::SourceClosed;
                        }
                    }
                }
            }

            let now = chrono::Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Gyro reader stats: {} samples, {} emitting deltas in last {}s",
                    samples_seen,
                    deltas_emitted,
                    log_interval.num_seconds()
                );
                samples_seen = 0;
                deltas_emitted = 0;
                last_log_time = now;
            }
        };

        self.sample_rx = Some(sample_rx);
        Ok((self, event))
    }

    /// Tears the subscription down and returns to Idle. Queued samples
    /// are discarded along with the receiver.
    fn unsubscribe(mut self) -> GyroReader<Idle> {
        self.subscription = None;
        self.sample_rx = None;
        debug!("Gyro reader unsubscribed from {}", self.hub.name());
        self.transition()
    }
}

async fn run_reader_loop(
    mut reader: GyroReader<Listening>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), ReaderError> {
    loop {
        let (listening, event) = reader.run_until_event(&mut shutdown_rx).await?;

        match event {
            LoopEvent::ConfigChanged => {
                info!("Config snapshot changed, restarting subscription");
                let mut idle = listening.unsubscribe();
                idle.adopt_config();
                reader = idle.subscribe()?;
            }
            LoopEvent::Shutdown => {
                let _idle = listening.unsubscribe();
                info!("Gyro reader stopped");
                return Ok(());
            }
            LoopEvent::SourceClosed => {
                let _idle = listening.unsubscribe();
                warn!("Gyro reader stopped: sample stream closed");
                return Ok(());
            }
        }
    }
}

/// Owning handle for a reader running in a background task.
///
/// Returned by [`GyroReaderHandle::start`]. Stop is idempotent, and
/// dropping the handle tears the subscription down as well, so every
/// exit path unsubscribes.
pub struct GyroReaderHandle {
    config_tx: watch::Sender<FilterConfig>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<JoinHandle<Result<(), ReaderError>>>,
}

impl GyroReaderHandle {
    /// Validates the config, subscribes synchronously, then spawns the
    /// reader task.
    ///
    /// Because the subscription completes before this returns, no sample
    /// can predate a successful start, and a missing sensor fails the
    /// start instead of the task. Must run inside a tokio runtime.
    pub fn start(
        hub: Arc<dyn SensorHub>,
        config: FilterConfig,
        handlers: AxisHandlers,
    ) -> Result<Self, ReaderError> {
        config.validate()?;

        let (config_tx, config_rx) = watch::channel(config.clone());
        let reader = GyroReader::create(hub, config, handlers, config_rx);
        let listening = reader.subscribe()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task_handle = tokio::spawn(run_reader_loop(listening, shutdown_rx));

        Ok(Self {
            config_tx,
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        })
    }

    /// Publishes a new config snapshot.
    ///
    /// The reader unsubscribes, rebuilds the filter from scratch and
    /// resubscribes at the (possibly new) rate before processing any
    /// further sample, so the swap is atomic from the stream's point of
    /// view.
    pub fn update_config(&self, config: FilterConfig) -> Result<(), ReaderError> {
        config.validate()?;
        self.config_tx
            .send(config)
            .map_err(|_| ReaderError::TaskError("reader task is gone".to_string()))
    }

    /// Signals shutdown and waits for the task to finish unsubscribing.
    /// Safe to call repeatedly; stops after the first are no-ops.
    pub async fn stop(&mut self) -> Result<(), ReaderError> {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Reader task already terminated");
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Reader task completed");
                    result
                }
                Err(e) => {
                    error!("Reader task panicked: {}", e);
                    Err(ReaderError::TaskError(format!(
                        "reader task panicked: {}",
                        e
                    )))
                }
            }
        } else {
            debug!("Reader already stopped");
            Ok(())
        }
    }
}

impl Drop for GyroReaderHandle {
    fn drop(&mut self) {
        // Owner teardown without an explicit stop still unsubscribes.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
