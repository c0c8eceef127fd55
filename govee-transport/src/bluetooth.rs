//! Bluetooth LE GATT backend (btleplug)
//!
//! Looks the light up among peripherals the adapter already knows about
//! (bonded or recently seen by the system). No scanning or pairing happens
//! here; the address has to be visible to the stack already.

use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::{future, StreamExt};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::protocol::gatt;
use crate::{GattConnector, GattSession, NotificationStream, Uuid};

/// Opens sessions through the first system Bluetooth adapter
pub struct BtleplugConnector {
    adapter: Adapter,
}

impl BtleplugConnector {
    /// Use the first adapter reported by the platform
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::DeviceNotFound("no Bluetooth adapter".into()))?;

        if let Ok(info) = adapter.adapter_info().await {
            debug!("Using Bluetooth adapter {}", info);
        }
        Ok(Self { adapter })
    }

    async fn find_peripheral(&self, address: &str) -> Result<Peripheral, TransportError> {
        self.adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.address().to_string().eq_ignore_ascii_case(address))
            .ok_or_else(|| TransportError::DeviceNotFound(address.to_string()))
    }
}

fn find_characteristic(
    peripheral: &Peripheral,
    uuid: Uuid,
) -> Result<Characteristic, TransportError> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or(TransportError::CharacteristicNotFound(uuid))
}

#[async_trait]
impl GattConnector for BtleplugConnector {
    async fn connect(&self, address: &str) -> Result<Arc<dyn GattSession>, TransportError> {
        let peripheral = self.find_peripheral(address).await?;

        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        peripheral.discover_services().await?;

        let resolved = find_characteristic(&peripheral, gatt::WRITE_CHARACTERISTIC).and_then(
            |write| Ok((write, find_characteristic(&peripheral, gatt::READ_CHARACTERISTIC)?)),
        );
        let (write_char, read_char) = match resolved {
            Ok(chars) => chars,
            Err(e) => {
                let _ = peripheral.disconnect().await;
                return Err(e);
            }
        };

        info!("GATT session open to {}", address);
        Ok(Arc::new(BtleplugSession {
            peripheral,
            write_char,
            read_char,
        }))
    }
}

struct BtleplugSession {
    peripheral: Peripheral,
    write_char: Characteristic,
    read_char: Characteristic,
}

impl BtleplugSession {
    fn characteristic(&self, uuid: Uuid) -> Result<&Characteristic, TransportError> {
        [&self.write_char, &self.read_char]
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(TransportError::CharacteristicNotFound(uuid))
    }
}

#[async_trait]
impl GattSession for BtleplugSession {
    async fn write_without_response(
        &self,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let target = self.characteristic(characteristic)?;
        self.peripheral
            .write(target, data, WriteType::WithoutResponse)
            .await?;
        Ok(())
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream, TransportError> {
        let target = self.characteristic(characteristic)?;
        self.peripheral.subscribe(target).await?;

        let notifications = self.peripheral.notifications().await?;
        Ok(Box::pin(notifications.filter_map(move |n| {
            future::ready((n.uuid == characteristic).then_some(n.value))
        })))
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
