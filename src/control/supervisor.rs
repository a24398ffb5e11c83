//! Typed-event supervisor for the gyro reader lifecycle

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bridge::{CursorMode, DeltaRouter, RouterConfig};
use crate::control::ControlEvent;
use crate::gyro::{FilterConfig, GyroReaderHandle, ReaderError};
use crate::sensor::SensorHub;

// Supervisor errors
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Reader lifecycle error: {0}")]
    ReaderError(#[from] ReaderError),
}

/// Owns the decision "is gyro aiming active" and the reader that goes
/// with it.
///
/// The reader runs iff a gyroscope is present, the user enabled gyro
/// aiming, and the game surface has the pointer grabbed. Availability is
/// probed once at construction; without a gyroscope the supervisor stays
/// silently inert no matter what events arrive.
pub struct AimSupervisor {
    hub: Arc<dyn SensorHub>,
    router: DeltaRouter,
    config: FilterConfig,
    events: mpsc::Receiver<ControlEvent>,
    reader: Option<GyroReaderHandle>,
    cursor_mode: CursorMode,
    enabled: bool,
    available: bool,
}

impl AimSupervisor {
    /// Probes availability and starts disengaged: cursor free, gyro
    /// aiming off until events say otherwise.
    pub fn new(
        hub: Arc<dyn SensorHub>,
        router: DeltaRouter,
        config: FilterConfig,
        events: mpsc::Receiver<ControlEvent>,
    ) -> Self {
        let available = hub.has_gyroscope();
        if available {
            info!("Aim supervisor created, gyroscope available via {}", hub.name());
        } else {
            info!("Aim supervisor created, no gyroscope present; gyro aiming stays inert");
        }

        Self {
            hub,
            router,
            config,
            events,
            reader: None,
            cursor_mode: CursorMode::Free,
            enabled: false,
            available,
        }
    }

    /// Consumes events until [`ControlEvent::Shutdown`] or the channel
    /// closing, reconciling the reader after each one. Disengages before
    /// returning, so the subscription never outlives the supervisor.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        info!("Aim supervisor running");

        loop {
            let event = match self.events.recv().await {
                Some(event) => event,
                None => {
                    info!("Control channel closed, shutting down");
                    break;
                }
            };

            debug!("Control event: {:?}", event);
            match event {
                ControlEvent::CursorMode(mode) => self.cursor_mode = mode,
                ControlEvent::GyroEnabled(enabled) => self.enabled = enabled,
                ControlEvent::ConfigChanged(config) => self.apply_config(config)?,
                ControlEvent::Routing(routing) => self.apply_routing(routing).await?,
                ControlEvent::Shutdown => {
                    info!("Shutdown event received");
                    break;
                }
            }

            self.reconcile().await?;
        }

        self.disengage().await?;
        info!("Aim supervisor stopped");
        Ok(())
    }

    /// Adopts a new filter snapshot and forwards it to a running reader,
    /// which rebuilds the filter before the next sample. An invalid
    /// snapshot is dropped with a warning and the previous one stays.
    fn apply_config(&mut self, config: FilterConfig) -> Result<(), SupervisorError> {
        if let Err(e) = config.validate() {
            warn!("Ignoring invalid filter config: {}", e);
            return Ok(());
        }

        if let Some(reader) = &self.reader {
            reader.update_config(config.clone())?;
        }
        self.config = config;
        Ok(())
    }

    /// Swaps inversion flags. Handlers are baked in at start, so a
    /// running reader is stopped here and reconcile brings it back with
    /// fresh routing.
    async fn apply_routing(&mut self, routing: RouterConfig) -> Result<(), SupervisorError> {
        self.router = self.router.with_config(routing);
        if self.reader.is_some() {
            debug!("Routing changed while engaged, restarting reader");
            self.disengage().await?;
        }
        Ok(())
    }

    async fn reconcile(&mut self) -> Result<(), SupervisorError> {
        let desired = self.available && self.enabled && self.cursor_mode == CursorMode::Grabbed;

        match (desired, self.reader.is_some()) {
            (true, false) => self.engage(),
            (false, true) => self.disengage().await?,
            _ => {}
        }
        Ok(())
    }

    /// Starts a reader with fresh handlers from the router. Failure
    /// (sensor vanished despite the probe) is logged and leaves the
    /// supervisor disengaged; there is no retry until another event
    /// changes the inputs.
    fn engage(&mut self) {
        info!("Engaging gyro aiming");
        match GyroReaderHandle::start(self.hub.clone(), self.config.clone(), self.router.handlers())
        {
            Ok(handle) => self.reader = Some(handle),
            Err(e) => error!("Failed to engage gyro aiming: {}", e),
        }
    }

    /// Stops the running reader, waiting for its unsubscription. No-op
    /// when already disengaged.
    async fn disengage(&mut self) -> Result<(), SupervisorError> {
        if let Some(mut reader) = self.reader.take() {
            info!("Disengaging gyro aiming");
            reader.stop().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{InputBridge, LogBridge};
    use crate::sensor::{AngularSample, SampleFeed, SampleRate, SensorError, Subscription, SyntheticHub};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    #[derive(Default)]
    struct RecordingBridge {
        calls: Mutex<Vec<(f32, f32)>>,
    }

    impl RecordingBridge {
        fn contains(&self, call: (f32, f32)) -> bool {
            self.calls.lock().unwrap().contains(&call)
        }
    }

    impl InputBridge for RecordingBridge {
        fn send_cursor_delta(&self, dx: f32, dy: f32) {
            self.calls.lock().unwrap().push((dx, dy));
        }
    }

    // Enumerable but refuses subscriptions, as if the sensor vanished
    // between the availability probe and the subscribe call.
    struct VanishingHub;

    impl SensorHub for VanishingHub {
        fn has_gyroscope(&self) -> bool {
            true
        }

        fn subscribe(
            &self,
            _rate: SampleRate,
            _tx: mpsc::Sender<AngularSample>,
        ) -> Result<Subscription, SensorError> {
            Err(SensorError::NoGyroscope)
        }

        fn name(&self) -> &str {
            "vanishing"
        }
    }

    fn passthrough_config() -> FilterConfig {
        FilterConfig {
            smoothing: false,
            threshold: 0.0,
            ..FilterConfig::default()
        }
    }

    fn spawn_supervisor(
        hub: Arc<SyntheticHub>,
        bridge: Arc<RecordingBridge>,
        routing: RouterConfig,
    ) -> (
        mpsc::Sender<ControlEvent>,
        JoinHandle<Result<(), SupervisorError>>,
    ) {
        let router = DeltaRouter::new(bridge, routing);
        let (tx, rx) = mpsc::channel(16);
        let supervisor = AimSupervisor::new(hub, router, passthrough_config(), rx);
        (tx, tokio::spawn(supervisor.run()))
    }

    async fn wait_for_subscriptions(hub: &SyntheticHub, expected: usize) {
        let settled = timeout(Duration::from_secs(2), async {
            while hub.active_subscriptions() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(
            settled.is_ok(),
            "active subscriptions never reached {}",
            expected
        );
    }

    // Feeds `sample` until the bridge records `expected`; the pushes
    // tolerate samples lost while a reader restarts mid-test.
    async fn feed_until_call(
        feed: &SampleFeed,
        bridge: &RecordingBridge,
        sample: f32,
        expected: (f32, f32),
    ) {
        let arrived = timeout(Duration::from_secs(2), async {
            while !bridge.contains(expected) {
                feed.push(sample, 0.0, 0.0).await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(arrived.is_ok(), "bridge never saw {:?}", expected);
    }

    #[tokio::test]
    async fn engages_only_when_all_conditions_hold() {
        let (hub, _feed) = SyntheticHub::manual();
        let hub = Arc::new(hub);
        let bridge = Arc::new(RecordingBridge::default());
        let (tx, task) = spawn_supervisor(hub.clone(), bridge, RouterConfig::default());

        // Enabled alone is not enough while the cursor is free.
        tx.send(ControlEvent::GyroEnabled(true)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hub.active_subscriptions(), 0);

        tx.send(ControlEvent::CursorMode(CursorMode::Grabbed))
            .await
            .unwrap();
        wait_for_subscriptions(&hub, 1).await;

        tx.send(ControlEvent::CursorMode(CursorMode::Free))
            .await
            .unwrap();
        wait_for_subscriptions(&hub, 0).await;

        tx.send(ControlEvent::CursorMode(CursorMode::Grabbed))
            .await
            .unwrap();
        wait_for_subscriptions(&hub, 1).await;

        tx.send(ControlEvent::GyroEnabled(false)).await.unwrap();
        wait_for_subscriptions(&hub, 0).await;

        tx.send(ControlEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stays_inert_without_a_gyroscope() {
        let hub = Arc::new(SyntheticHub::absent());
        let bridge = Arc::new(LogBridge::default());
        let router = DeltaRouter::new(bridge, RouterConfig::default());
        let (tx, rx) = mpsc::channel(16);
        let supervisor = AimSupervisor::new(hub.clone(), router, passthrough_config(), rx);
        let task = tokio::spawn(supervisor.run());

        tx.send(ControlEvent::GyroEnabled(true)).await.unwrap();
        tx.send(ControlEvent::CursorMode(CursorMode::Grabbed))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hub.active_subscriptions(), 0);

        tx.send(ControlEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn deltas_reach_the_bridge_while_engaged() {
        let (hub, feed) = SyntheticHub::manual();
        let hub = Arc::new(hub);
        let bridge = Arc::new(RecordingBridge::default());
        let (tx, task) = spawn_supervisor(hub.clone(), bridge.clone(), RouterConfig::default());

        tx.send(ControlEvent::GyroEnabled(true)).await.unwrap();
        tx.send(ControlEvent::CursorMode(CursorMode::Grabbed))
            .await
            .unwrap();
        wait_for_subscriptions(&hub, 1).await;

        feed_until_call(&feed, &bridge, 0.5, (0.5, 0.0)).await;

        tx.send(ControlEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(hub.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn config_change_reaches_the_running_reader() {
        let (hub, feed) = SyntheticHub::manual();
        let hub = Arc::new(hub);
        let bridge = Arc::new(RecordingBridge::default());
        let (tx, task) = spawn_supervisor(hub.clone(), bridge.clone(), RouterConfig::default());

        tx.send(ControlEvent::GyroEnabled(true)).await.unwrap();
        tx.send(ControlEvent::CursorMode(CursorMode::Grabbed))
            .await
            .unwrap();
        wait_for_subscriptions(&hub, 1).await;
        feed_until_call(&feed, &bridge, 0.5, (0.5, 0.0)).await;

        let doubled = FilterConfig {
            sensitivity: 2.0,
            ..passthrough_config()
        };
        tx.send(ControlEvent::ConfigChanged(doubled)).await.unwrap();

        feed_until_call(&feed, &bridge, 0.5, (1.0, 0.0)).await;

        tx.send(ControlEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn routing_change_restarts_with_new_flags() {
        let (hub, feed) = SyntheticHub::manual();
        let hub = Arc::new(hub);
        let bridge = Arc::new(RecordingBridge::default());
        let (tx, task) = spawn_supervisor(hub.clone(), bridge.clone(), RouterConfig::default());

        tx.send(ControlEvent::GyroEnabled(true)).await.unwrap();
        tx.send(ControlEvent::CursorMode(CursorMode::Grabbed))
            .await
            .unwrap();
        wait_for_subscriptions(&hub, 1).await;
        feed_until_call(&feed, &bridge, 0.5, (0.5, 0.0)).await;

        tx.send(ControlEvent::Routing(RouterConfig {
            invert_x: true,
            invert_y: false,
        }))
        .await
        .unwrap();

        feed_until_call(&feed, &bridge, 0.5, (-0.5, 0.0)).await;

        tx.send(ControlEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn engage_failure_leaves_the_supervisor_running() {
        let bridge = Arc::new(LogBridge::default());
        let router = DeltaRouter::new(bridge, RouterConfig::default());
        let (tx, rx) = mpsc::channel(16);
        let supervisor =
            AimSupervisor::new(Arc::new(VanishingHub), router, passthrough_config(), rx);
        let task = tokio::spawn(supervisor.run());

        tx.send(ControlEvent::GyroEnabled(true)).await.unwrap();
        tx.send(ControlEvent::CursorMode(CursorMode::Grabbed))
            .await
            .unwrap();

        // The failed engage is logged, not fatal; later events still land.
        tx.send(ControlEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closing_the_channel_disengages_and_exits() {
        let (hub, _feed) = SyntheticHub::manual();
        let hub = Arc::new(hub);
        let bridge = Arc::new(RecordingBridge::default());
        let (tx, task) = spawn_supervisor(hub.clone(), bridge, RouterConfig::default());

        tx.send(ControlEvent::GyroEnabled(true)).await.unwrap();
        tx.send(ControlEvent::CursorMode(CursorMode::Grabbed))
            .await
            .unwrap();
        wait_for_subscriptions(&hub, 1).await;

        drop(tx);
        task.await.unwrap().unwrap();
        assert_eq!(hub.active_subscriptions(), 0);
    }
}
