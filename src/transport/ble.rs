//! BLE transport trait definition

use std::time::Duration;

use trait_variant::make;
use uuid::Uuid;

use crate::core::discovery::EndpointRef;
use crate::core::error::TransportResult;
use crate::core::types::{DiscoveredDevice, GattService};

/// Abstraction over a central-role BLE GATT connection
///
/// This trait enables testing by allowing mock implementations while
/// providing the read/write/descriptor-read primitives the provisioning
/// protocol actually uses. Notifications and indications are deliberately
/// absent; the device never pushes unsolicited data.
#[make(Send)]
pub trait BleTransport: Sync + 'static {
    /// Scan for nearby devices over the given window.
    async fn scan(&self, duration: Duration) -> TransportResult<Vec<DiscoveredDevice>>;

    /// Connect to a device by its transport-level identifier.
    async fn connect(&self, device_id: &str) -> TransportResult<()>;

    /// Tear down the connection. All characteristic handles become invalid.
    async fn disconnect(&self) -> TransportResult<()>;

    /// Resolve the remote GATT database for the connected device.
    async fn discover_services(&self) -> TransportResult<()>;

    /// Snapshot of the resolved GATT tree.
    async fn services(&self) -> TransportResult<Vec<GattService>>;

    /// Write `data` to the characteristic addressed by `endpoint`.
    async fn write(&self, endpoint: &EndpointRef, data: &[u8]) -> TransportResult<()>;

    /// Read the current value of the characteristic addressed by `endpoint`.
    async fn read(&self, endpoint: &EndpointRef) -> TransportResult<Vec<u8>>;

    /// Read a descriptor of the given characteristic.
    async fn read_descriptor(
        &self,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
    ) -> TransportResult<Vec<u8>>;
}
