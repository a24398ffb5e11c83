use color_eyre::Result;
use gyroaim::bridge::{CursorMode, DeltaRouter, LogBridge};
use gyroaim::control::{AimSupervisor, ControlEvent};
use gyroaim::sensor::{GamepadHub, SensorHub, SyntheticHub};
use gyroaim::settings::{settings_path, AimSettings, SourceKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Waveform for the synthetic backend: a slow sweep that keeps the
/// dead-zone gate visibly opening and closing.
const WAVE_AMPLITUDE_RAD_S: f32 = 0.8;
const WAVE_PERIOD: Duration = Duration::from_secs(4);

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    // Einstellungen laden
    info!("Loading gyro aim settings from {}", settings_path().display());
    let settings = AimSettings::load_or_default().await?.clamped();
    info!("Settings: {:?}", settings);

    // Sensor-Backend auswählen
    let hub = pick_hub(&settings);
    info!(
        "Sensor backend: {} (gyroscope present: {})",
        hub.name(),
        hub.has_gyroscope()
    );

    let bridge = Arc::new(LogBridge::default());
    let router = DeltaRouter::new(bridge.clone(), settings.routing());

    // Supervisor starten und Startzustand einspeisen
    let (control_tx, control_rx) = mpsc::channel(16);
    let supervisor = AimSupervisor::new(hub, router, settings.filter_config(), control_rx);
    let supervisor_task = tokio::spawn(supervisor.run());

    control_tx
        .send(ControlEvent::GyroEnabled(settings.enabled))
        .await?;
    control_tx
        .send(ControlEvent::CursorMode(CursorMode::Grabbed))
        .await?;

    if !settings.enabled {
        info!(
            "Gyro aiming is disabled; set enabled = true in {} to see deltas",
            settings_path().display()
        );
    }

    info!("Running until ctrl-c");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    control_tx.send(ControlEvent::Shutdown).await?;
    supervisor_task.await??;

    info!("Cursor deltas sent to the bridge: {}", bridge.deltas_sent());
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// Builds the backend the settings ask for. A gamepad backend that fails
/// to construct falls back to the synthetic waveform; one without a
/// connected pad is kept as-is, so the availability gate stays
/// observable.
fn pick_hub(settings: &AimSettings) -> Arc<dyn SensorHub> {
    match settings.source {
        SourceKind::Gamepad => match GamepadHub::new() {
            Ok(hub) => return Arc::new(hub),
            Err(e) => {
                warn!(
                    "Gamepad backend unavailable ({}), using synthetic waveform",
                    e
                );
            }
        },
        SourceKind::Synthetic => {}
    }
    Arc::new(SyntheticHub::wave(WAVE_AMPLITUDE_RAD_S, WAVE_PERIOD))
}
