//! # Sensor Transport Module
//!
//! Connects to a BLE heart-rate strap and streams raw Heart Rate Measurement
//! notifications to the monitor thread. This is the only module that touches
//! the Bluetooth stack during a session; the acquisition pipeline never sees
//! anything but the raw payload bytes and a wall-clock timestamp, so web,
//! mobile, or simulated transports all drive the same decoder.
//!
//! Pause and stop are cooperative: the monitor flips shared atomic flags and
//! this module reacts at the transport boundary (unsubscribe/resubscribe for
//! pause, disconnect for stop). The core simply stops receiving ingest calls
//! while paused and resumes from its existing window state.

use crate::error::ConnectionError;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use crossbeam_channel::Sender;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Heart Rate service (0x180D)
pub const HEART_RATE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_180d_0000_1000_8000_0080_5f9b_34fb);

/// Heart Rate Measurement characteristic (0x2A37)
pub const HEART_RATE_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a37_0000_1000_8000_0080_5f9b_34fb);

/// Messages sent from the transport to the monitor thread.
#[derive(Debug)]
pub enum SensorUpdate {
    /// One raw characteristic payload plus its arrival wall-clock time.
    Notification { payload: Vec<u8>, received_at_ms: u64 },
    ConnectionStatus(ConnectionStatus),
}

#[derive(Debug, Clone)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error(String),
}

/// Shared flags the monitor uses to steer an in-flight session.
#[derive(Debug, Default)]
pub struct SessionControl {
    stop: AtomicBool,
    paused: AtomicBool,
}

impl SessionControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

/// Connect to `device_id`, subscribe to heart-rate notifications, and pump
/// them into `sender` until stop is requested or the device goes away.
/// `scan_duration_secs` bounds the scan that locates the peripheral.
pub async fn start_data_collection(
    device_id: String,
    sender: Sender<SensorUpdate>,
    control: Arc<SessionControl>,
    scan_duration_secs: u64,
) {
    let _ = sender.send(SensorUpdate::ConnectionStatus(ConnectionStatus::Connecting));

    match run_session(&device_id, &sender, &control, scan_duration_secs).await {
        Ok(()) => {
            let _ = sender.send(SensorUpdate::ConnectionStatus(ConnectionStatus::Disconnected));
        }
        Err(e) => {
            log::error!("{}", e);
            let _ = sender.send(SensorUpdate::ConnectionStatus(ConnectionStatus::Error(
                e.to_string(),
            )));
        }
    }
}

async fn run_session(
    device_id: &str,
    sender: &Sender<SensorUpdate>,
    control: &SessionControl,
    scan_duration_secs: u64,
) -> Result<(), ConnectionError> {
    let manager = Manager::new()
        .await
        .map_err(|_| ConnectionError::NoAdapter)?;
    let central = manager
        .adapters()
        .await
        .map_err(|_| ConnectionError::NoAdapter)?
        .into_iter()
        .next()
        .ok_or(ConnectionError::NoAdapter)?;

    let peripheral = find_peripheral(&central, device_id, scan_duration_secs).await?;

    peripheral
        .connect()
        .await
        .map_err(|e| ConnectionError::DeviceConnection {
            device_id: device_id.to_string(),
            reason: e.to_string(),
        })?;
    peripheral
        .discover_services()
        .await
        .map_err(|e| ConnectionError::DeviceConnection {
            device_id: device_id.to_string(),
            reason: e.to_string(),
        })?;

    let characteristic = peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == HEART_RATE_MEASUREMENT_UUID)
        .ok_or_else(|| ConnectionError::NoHeartRateCharacteristic(device_id.to_string()))?;

    peripheral
        .subscribe(&characteristic)
        .await
        .map_err(|e| ConnectionError::Subscription(e.to_string()))?;

    log::info!("Connected to {} and subscribed to heart rate notifications", device_id);
    let _ = sender.send(SensorUpdate::ConnectionStatus(ConnectionStatus::Connected));

    let mut notifications = peripheral
        .notifications()
        .await
        .map_err(|e| ConnectionError::Subscription(e.to_string()))?;

    let mut was_paused = false;
    loop {
        if control.should_stop() {
            log::info!("Disconnecting from {}", device_id);
            break;
        }

        // Pause is enforced at the transport: stop notifications while
        // paused, resubscribe on resume. The session keeps its state.
        let paused = control.is_paused();
        if paused != was_paused {
            let result = if paused {
                log::info!("Pausing notifications");
                peripheral.unsubscribe(&characteristic).await
            } else {
                log::info!("Resuming notifications");
                peripheral.subscribe(&characteristic).await
            };
            if let Err(e) = result {
                return Err(ConnectionError::Subscription(e.to_string()));
            }
            was_paused = paused;
        }

        tokio::select! {
            maybe = notifications.next() => {
                match maybe {
                    Some(data) => {
                        if data.uuid == HEART_RATE_MEASUREMENT_UUID && !was_paused {
                            let _ = sender.send(SensorUpdate::Notification {
                                payload: data.value,
                                received_at_ms: now_ms(),
                            });
                        }
                    }
                    None => {
                        log::warn!("Notification stream ended for {}", device_id);
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }

    let _ = peripheral.unsubscribe(&characteristic).await;
    let _ = peripheral.disconnect().await;
    Ok(())
}

const SCAN_POLL_INTERVAL_MS: u64 = 500;

/// Polls at `SCAN_POLL_INTERVAL_MS` for the configured scan duration, with a
/// floor of one second so a zeroed config still gets a chance to find the
/// device.
fn scan_attempts(scan_duration_secs: u64) -> u64 {
    scan_duration_secs.max(1) * 1000 / SCAN_POLL_INTERVAL_MS
}

/// Scan until the requested peripheral shows up, bounded by the configured
/// scan duration.
async fn find_peripheral(
    central: &Adapter,
    device_id: &str,
    scan_duration_secs: u64,
) -> Result<Peripheral, ConnectionError> {
    let filter = ScanFilter {
        services: vec![HEART_RATE_SERVICE_UUID],
    };
    central
        .start_scan(filter)
        .await
        .map_err(|e| ConnectionError::DeviceConnection {
            device_id: device_id.to_string(),
            reason: e.to_string(),
        })?;

    for _ in 0..scan_attempts(scan_duration_secs) {
        if let Ok(peripherals) = central.peripherals().await {
            for peripheral in peripherals {
                if peripheral.id().to_string() == device_id {
                    let _ = central.stop_scan().await;
                    return Ok(peripheral);
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(SCAN_POLL_INTERVAL_MS)).await;
    }

    let _ = central.stop_scan().await;
    Err(ConnectionError::DeviceConnection {
        device_id: device_id.to_string(),
        reason: "device not found during scan".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_control_flags() {
        let control = SessionControl::new();
        assert!(!control.should_stop());
        assert!(!control.is_paused());

        control.set_paused(true);
        assert!(control.is_paused());
        control.set_paused(false);
        assert!(!control.is_paused());

        control.request_stop();
        assert!(control.should_stop());
    }

    #[test]
    fn test_scan_attempts_track_configured_duration() {
        assert_eq!(scan_attempts(5), 10);
        assert_eq!(scan_attempts(1), 2);
        // Zero still scans for a second rather than giving up immediately
        assert_eq!(scan_attempts(0), 2);
    }

    #[test]
    fn test_uuid_constants() {
        assert_eq!(
            HEART_RATE_SERVICE_UUID.to_string(),
            "0000180d-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            HEART_RATE_MEASUREMENT_UUID.to_string(),
            "00002a37-0000-1000-8000-00805f9b34fb"
        );
    }
}
