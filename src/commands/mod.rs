//! Command handlers for the CLI application.
//!
//! - `frame`: offline frame tools (decode, encode, effects)
//! - `light`: device commands (status, on, off, brightness, color, effect)

pub mod frame;
pub mod light;

use std::sync::Arc;

use anyhow::{Context, Result};
use govee_ble::Config;
use govee_light::GoveeLight;
use govee_transport::GattConnector;
use tracing::debug;

/// Result type for command handlers
pub type CommandResult = Result<()>;

/// Open the configured light. Nothing connects until the first flush.
pub async fn open_light(config: &Config) -> Result<GoveeLight> {
    let address = config
        .address
        .as_deref()
        .context("no device address: pass --address or set `address` in the config file")?;
    let connector = connector().await?;
    debug!("Opening light {} ({:?})", address, config.variant());
    Ok(GoveeLight::new(connector, config.light_config(address)))
}

#[cfg(feature = "bluetooth")]
async fn connector() -> Result<Arc<dyn GattConnector>> {
    let connector = govee_transport::BtleplugConnector::new()
        .await
        .context("failed to open Bluetooth adapter")?;
    Ok(Arc::new(connector))
}

#[cfg(not(feature = "bluetooth"))]
async fn connector() -> Result<Arc<dyn GattConnector>> {
    anyhow::bail!("built without Bluetooth support; rebuild with --features bluetooth")
}
