//! gilrs-backed desktop stand-in for a gyroscope
//!
//! Right-stick deflection is emulated as angular velocity: full deflection
//! maps to [`FULL_SCALE_RAD_S`] on that axis, sampled at the requested
//! rate. Lets the whole pipeline run on a dev machine without motion
//! hardware.

use gilrs::{Axis, Event, EventType, Gilrs};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::sensor::{AngularSample, SampleRate, SensorError, SensorHub, Subscription};

/// Angular velocity at full stick deflection, rad/s.
pub const FULL_SCALE_RAD_S: f32 = 2.0;

pub struct GamepadHub {
    present: bool,
    pad_name: Option<String>,
}

impl GamepadHub {
    /// Probes for a connected gamepad once; the result drives
    /// [`SensorHub::has_gyroscope`] for the hub's lifetime.
    pub fn new() -> Result<Self, SensorError> {
        info!("Initializing gilrs gamepad interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => g,
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(SensorError::InitializationError(e.to_string()));
            }
        };

        let pad_name = gilrs
            .gamepads()
            .next()
            .map(|(_, pad)| pad.name().to_string());
        match &pad_name {
            Some(name) => info!("Gamepad acting as gyroscope stand-in: {}", name),
            None => warn!("No gamepad connected, hub reports no gyroscope"),
        }

        Ok(Self {
            present: pad_name.is_some(),
            pad_name,
        })
    }
}

impl SensorHub for GamepadHub {
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
        let task_token = token.clone();

        tokio::spawn(async move {
            // A gilrs context is not shareable, each subscription owns one.
            let mut gilrs = match Gilrs::new() {
                Ok(g) => g,
                Err(e) => {
                    error!("Failed to initialize gilrs for subscription: {}", e);
                    return;
                }
            };

            let mut interval = tokio::time::interval(rate.interval());
            let mut rate_x = 0.0f32;
            let mut rate_y = 0.0f32;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Gamepad delivery cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        // Drain pending events, keep the latest deflection.
                        while let Some(Event { event, .. }) = gilrs.next_event() {
                            match event {
                                EventType::AxisChanged(Axis::RightStickX, value, _) => {
                                    rate_x = value * FULL_SCALE_RAD_S;
                                }
                                EventType::AxisChanged(Axis::RightStickY, value, _) => {
                                    rate_y = value * FULL_SCALE_RAD_S;
                                }
                                EventType::Disconnected => {
                                    warn!("Gamepad disconnected, deflection reset to zero");
                                    rate_x = 0.0;
                                    rate_y = 0.0;
                                }
                                _ => {}
                            }
                        }

                        // A real gyroscope streams continuously, so emit every
                        // tick; idle sticks produce samples the dead-zone eats.
                        let sample = AngularSample::new(rate_x, rate_y, 0.0);
                        if tx.send(sample).await.is_err() {
                            debug!("Gamepad receiver closed, stopping delivery");
                            break;
                        }
                    }
                }
            }
        });

        info!("Sensor subscription started: {} at {:?}", self.name(), rate);
        Ok(Subscription::new(token))
    }

    fn name(&self) -> &str {
        self.pad_name.as_deref().unwrap_or("gamepad")
    }
}
