// Govee BLE light driver - shared library
// Configuration and helpers used by the govee-ble binary

pub mod config;
pub mod hex;

pub use config::{Config, RetryConfig};
