//! Linux bluetoothd transport (central role)

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use bluer::gatt::remote::{Characteristic, Descriptor};
use bluer::{Adapter, AdapterEvent, Address, Device};
use futures::{StreamExt, pin_mut};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::discovery::EndpointRef;
use crate::core::error::{TransportError, TransportResult};
use crate::core::types::{DiscoveredDevice, GattCharacteristic, GattService};
use crate::transport::ble::BleTransport;

#[derive(Default)]
struct Inner {
    device: Option<Device>,
    snapshot: Vec<GattService>,
    characteristics: HashMap<(Uuid, Uuid), Characteristic>,
    descriptors: HashMap<(Uuid, Uuid), Descriptor>,
}

/// BLE transport backed by bluetoothd via `bluer`
pub struct BluerTransport {
    // Keeps the D-Bus connection alive for the adapter handle
    _session: bluer::Session,
    adapter: Adapter,
    inner: Mutex<Inner>,
}

impl BluerTransport {
    /// Open the default adapter and power it on.
    pub async fn new() -> TransportResult<Self> {
        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;
        adapter.set_powered(true).await?;

        info!(adapter = %adapter.name(), "using BLE adapter");

        Ok(Self {
            _session: session,
            adapter,
            inner: Mutex::new(Inner::default()),
        })
    }

    async fn characteristic(&self, endpoint: &EndpointRef) -> TransportResult<Characteristic> {
        let inner = self.inner.lock().await;
        if inner.device.is_none() {
            return Err(TransportError::NotConnected);
        }
        inner
            .characteristics
            .get(&(endpoint.service, endpoint.characteristic))
            .cloned()
            .ok_or(TransportError::CharacteristicMissing {
                service: endpoint.service,
                characteristic: endpoint.characteristic,
            })
    }
}

impl BleTransport for BluerTransport {
    async fn scan(&self, duration: Duration) -> TransportResult<Vec<DiscoveredDevice>> {
        let mut addresses: HashSet<Address> =
            self.adapter.device_addresses().await?.into_iter().collect();

        let events = self.adapter.discover_devices().await?;
        pin_mut!(events);
        let window = tokio::time::sleep(duration);
        pin_mut!(window);

        loop {
            tokio::select! {
                _ = &mut window => break,
                event = events.next() => match event {
                    Some(AdapterEvent::DeviceAdded(address)) => {
                        addresses.insert(address);
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }

        let mut devices = Vec::new();
        for address in addresses {
            let device = self.adapter.device(address)?;
            let name = device.name().await.unwrap_or_default();
            let rssi = device.rssi().await.unwrap_or_default();
            devices.push(DiscoveredDevice {
                id: address.to_string(),
                name,
                rssi,
            });
        }

        debug!(devices = devices.len(), "scan window closed");
        Ok(devices)
    }

    async fn connect(&self, device_id: &str) -> TransportResult<()> {
        let address: Address = device_id
            .parse()
            .map_err(|_| TransportError::InvalidAddress(device_id.to_string()))?;
        let device = self.adapter.device(address)?;

        if !device.is_connected().await? {
            device.connect().await?;
        }
        info!(device = device_id, "connected");

        let mut inner = self.inner.lock().await;
        inner.device = Some(device);
        inner.snapshot.clear();
        inner.characteristics.clear();
        inner.descriptors.clear();
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(device) = inner.device.take() {
            device.disconnect().await?;
            info!(device = %device.address(), "disconnected");
        }
        inner.snapshot.clear();
        inner.characteristics.clear();
        inner.descriptors.clear();
        Ok(())
    }

    async fn discover_services(&self) -> TransportResult<()> {
        let mut inner = self.inner.lock().await;
        let device = inner.device.clone().ok_or(TransportError::NotConnected)?;
        inner.snapshot.clear();
        inner.characteristics.clear();
        inner.descriptors.clear();

        let mut snapshot = Vec::new();
        for service in device.services().await? {
            let service_uuid = service.uuid().await?;
            let mut characteristics = Vec::new();

            for characteristic in service.characteristics().await? {
                let characteristic_uuid = characteristic.uuid().await?;
                let mut descriptor_uuids = Vec::new();

                for descriptor in characteristic.descriptors().await? {
                    let descriptor_uuid = descriptor.uuid().await?;
                    descriptor_uuids.push(descriptor_uuid);
                    inner
                        .descriptors
                        .insert((characteristic_uuid, descriptor_uuid), descriptor);
                }

                inner
                    .characteristics
                    .insert((service_uuid, characteristic_uuid), characteristic);
                characteristics.push(GattCharacteristic {
                    uuid: characteristic_uuid,
                    descriptors: descriptor_uuids,
                });
            }

            snapshot.push(GattService {
                uuid: service_uuid,
                characteristics,
            });
        }

        debug!(services = snapshot.len(), "GATT services resolved");
        inner.snapshot = snapshot;
        Ok(())
    }

    async fn services(&self) -> TransportResult<Vec<GattService>> {
        let inner = self.inner.lock().await;
        if inner.device.is_none() {
            return Err(TransportError::NotConnected);
        }
        Ok(inner.snapshot.clone())
    }

    async fn write(&self, endpoint: &EndpointRef, data: &[u8]) -> TransportResult<()> {
        let characteristic = self.characteristic(endpoint).await?;
        characteristic.write(data).await?;
        Ok(())
    }

    async fn read(&self, endpoint: &EndpointRef) -> TransportResult<Vec<u8>> {
        let characteristic = self.characteristic(endpoint).await?;
        Ok(characteristic.read().await?)
    }

    async fn read_descriptor(
        &self,
        _service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
    ) -> TransportResult<Vec<u8>> {
        let inner = self.inner.lock().await;
        if inner.device.is_none() {
            return Err(TransportError::NotConnected);
        }
        let handle = inner
            .descriptors
            .get(&(characteristic, descriptor))
            .cloned()
            .ok_or(TransportError::DescriptorUnavailable {
                characteristic,
                descriptor,
            })?;
        drop(inner);
        Ok(handle.read().await?)
    }
}
