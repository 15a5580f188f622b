//! Discovery of nearby heart-rate devices. Scans are filtered to the
//! standard Heart Rate service so any compliant strap (Polar, Garmin,
//! Wahoo, ...) shows up regardless of vendor naming.

use crate::error::ScanError;
use crate::sensor::HEART_RATE_SERVICE_UUID;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::Manager;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothDevice {
    pub id: String,
    pub name: String,
}

impl BluetoothDevice {
    pub fn new(id: String, name: String) -> Self {
        Self { id, name }
    }
}

/// Scans for heart-rate devices for `scan_duration_secs`.
pub async fn scan_devices(scan_duration_secs: u64) -> Result<Vec<BluetoothDevice>, ScanError> {
    let manager = Manager::new()
        .await
        .map_err(|e| ScanError::ManagerInit(e.to_string()))?;

    let adapters = manager
        .adapters()
        .await
        .map_err(|e| ScanError::ManagerInit(e.to_string()))?;

    let central = adapters.into_iter().next().ok_or(ScanError::NoAdapters)?;

    let filter = ScanFilter {
        services: vec![HEART_RATE_SERVICE_UUID],
    };
    central
        .start_scan(filter)
        .await
        .map_err(|e| ScanError::ScanFailed(e.to_string()))?;

    tokio::time::sleep(Duration::from_secs(scan_duration_secs)).await;

    central
        .stop_scan()
        .await
        .map_err(|e| ScanError::ScanFailed(e.to_string()))?;

    let peripherals = central
        .peripherals()
        .await
        .map_err(|e| ScanError::ScanFailed(e.to_string()))?;

    let mut devices = Vec::new();

    for peripheral in peripherals {
        if let Ok(Some(props)) = peripheral.properties().await {
            let name = props
                .local_name
                .unwrap_or_else(|| "Unknown heart rate device".to_string());
            devices.push(BluetoothDevice::new(peripheral.id().to_string(), name));
        }
    }

    log::info!("Scan finished: {} device(s) found", devices.len());
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bluetooth_device_equality() {
        let a = BluetoothDevice::new("aa:bb".to_string(), "Strap".to_string());
        let b = BluetoothDevice::new("aa:bb".to_string(), "Strap".to_string());
        assert_eq!(a, b);
    }
}
