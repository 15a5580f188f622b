//! # Connection Management Module
//!
//! Handles Bluetooth device connection lifecycle for heart-rate sensors.
//! Encapsulates the complexity of connecting, subscribing, and managing
//! the async runtime for sensor communication.
//!
//! ## Key Components
//! - `ConnectionManager`: Manages connection thread and command processing
//! - `ConnectionCommand`: Commands sent from the shell to the connection thread
//! - Per-connection `SessionControl` flags for pause and graceful disconnect
//!
//! ## Why
//! The connection process involves blocking async operations. Running in a
//! separate thread with its own Tokio runtime keeps the monitor loop and the
//! stdin shell responsive, and lets a disconnect command interrupt a
//! connection still in progress.

use crate::error::ConnectionError;
use crate::sensor::{start_data_collection, SensorUpdate, SessionControl};
use crossbeam_channel::Sender;
use std::sync::mpsc;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
pub enum ConnectionCommand {
    Connect(String),
    Pause,
    Resume,
    Disconnect,
}

/// Manages the connection lifecycle for heart-rate sensors.
///
/// Runs in a dedicated thread with its own Tokio runtime. Processes
/// connection commands and owns the control flags for the active session.
pub struct ConnectionManager {
    command_receiver: mpsc::Receiver<ConnectionCommand>,
    sensor_sender: Sender<SensorUpdate>,
    scan_duration_secs: u64,
}

/// Stop whatever session the old flags steer and install fresh flags for the
/// next one. Connecting over a live session supersedes it; without the stop
/// the old task would keep pumping notifications into the same channel.
fn supersede_session(control: &mut Option<Arc<SessionControl>>) -> Arc<SessionControl> {
    if let Some(old) = control.take() {
        log::info!("Connection manager: Stopping previous session before connecting");
        old.request_stop();
    }
    let fresh = SessionControl::new();
    *control = Some(fresh.clone());
    fresh
}

impl ConnectionManager {
    /// Creates a new ConnectionManager.
    ///
    /// Returns the manager and a sender for issuing commands from other threads.
    pub fn new(
        sensor_sender: Sender<SensorUpdate>,
        scan_duration_secs: u64,
    ) -> (Self, mpsc::Sender<ConnectionCommand>) {
        let (command_sender, command_receiver) = mpsc::channel();

        let manager = ConnectionManager {
            command_receiver,
            sensor_sender,
            scan_duration_secs,
        };

        (manager, command_sender)
    }

    /// Runs the connection management loop.
    ///
    /// This should be called in a spawned thread. It blocks until the command
    /// channel is closed.
    pub fn run(self) {
        let rt = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                let error = ConnectionError::RuntimeCreation(e.to_string());
                log::error!("{}", error);
                let _ = self.sensor_sender.send(SensorUpdate::ConnectionStatus(
                    crate::sensor::ConnectionStatus::Error(error.to_string()),
                ));
                return;
            }
        };

        let mut control: Option<Arc<SessionControl>> = None;

        while let Ok(command) = self.command_receiver.recv() {
            match command {
                ConnectionCommand::Connect(device_id) => {
                    log::info!("Connection manager: Connecting to device: {}", device_id);

                    let session_control = supersede_session(&mut control);
                    let sender_clone = self.sensor_sender.clone();
                    let scan_duration_secs = self.scan_duration_secs;

                    // Spawned, not blocked on, so a disconnect command can
                    // still interrupt a connection in progress
                    rt.spawn(async move {
                        start_data_collection(
                            device_id,
                            sender_clone,
                            session_control,
                            scan_duration_secs,
                        )
                        .await;
                    });
                }
                ConnectionCommand::Pause => {
                    if let Some(flags) = &control {
                        flags.set_paused(true);
                    } else {
                        log::warn!("Connection manager: Pause requested with no active session");
                    }
                }
                ConnectionCommand::Resume => {
                    if let Some(flags) = &control {
                        flags.set_paused(false);
                    } else {
                        log::warn!("Connection manager: Resume requested with no active session");
                    }
                }
                ConnectionCommand::Disconnect => {
                    log::info!("Connection manager: Disconnect requested");
                    if let Some(flags) = &control {
                        flags.request_stop();
                    }
                    control = None;
                }
            }
        }

        log::info!("Connection manager: Command channel closed, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_connection_manager_creation() {
        let (sensor_sender, _sensor_receiver) = unbounded();
        let (_manager, command_sender) = ConnectionManager::new(sensor_sender, 5);

        // Verify we can send commands
        assert!(command_sender.send(ConnectionCommand::Disconnect).is_ok());
    }

    #[test]
    fn test_supersede_stops_previous_session() {
        let mut control = Some(SessionControl::new());
        let old = control.clone().unwrap();

        let fresh = supersede_session(&mut control);

        assert!(old.should_stop());
        assert!(!fresh.should_stop());
        assert!(Arc::ptr_eq(&fresh, control.as_ref().unwrap()));
    }

    #[test]
    fn test_supersede_with_no_session_installs_fresh_flags() {
        let mut control = None;
        let fresh = supersede_session(&mut control);
        assert!(!fresh.should_stop());
        assert!(control.is_some());
    }
}
