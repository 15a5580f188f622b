//! BLE heart rate & HRV session monitor.
//!
//! The acquisition pipeline (decode, RR window, artifact filter, HRV score)
//! and session statistics live in the library; the binary wires them to a
//! btleplug transport and a terminal shell.

pub mod config;
pub mod connection;
pub mod device_scanner;
pub mod error;
pub mod hrv;
pub mod measurement;
pub mod monitor;
pub mod rr_window;
pub mod sensor;
pub mod session;
pub mod summary;
