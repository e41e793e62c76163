//! Scriptable in-memory transport for testing

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::discovery::EndpointRef;
use crate::core::error::{TransportError, TransportResult};
use crate::core::types::{DiscoveredDevice, GattService};
use crate::transport::ble::BleTransport;

/// Computes a response to a characteristic write, queued for the next read
/// of the same characteristic.
pub type MockResponder = Box<dyn FnMut(Uuid, &[u8]) -> Option<Vec<u8>> + Send>;

/// Internal state for the mock transport
#[derive(Default)]
struct MockState {
    devices: Vec<DiscoveredDevice>,
    services: Vec<GattService>,
    descriptor_values: HashMap<(Uuid, Uuid), Vec<u8>>,
    fail_descriptor_reads: bool,
    read_queues: HashMap<Uuid, VecDeque<Vec<u8>>>,
    writes: Vec<(Uuid, Vec<u8>)>,
    responder: Option<MockResponder>,
    connected: bool,
}

/// Mock BLE transport for testing
///
/// Reads are served from per-characteristic queues (fed directly or by a
/// responder closure reacting to writes); every write is logged for
/// call-count assertions.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport with default state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Configure the devices a scan window returns
    pub async fn set_devices(&self, devices: Vec<DiscoveredDevice>) {
        self.inner.lock().await.devices = devices;
    }

    /// Configure the GATT tree reported after service discovery
    pub async fn set_services(&self, services: Vec<GattService>) {
        self.inner.lock().await.services = services;
    }

    /// Set the value of one descriptor
    pub async fn set_descriptor(&self, characteristic: Uuid, descriptor: Uuid, value: Vec<u8>) {
        self.inner
            .lock()
            .await
            .descriptor_values
            .insert((characteristic, descriptor), value);
    }

    /// Make every descriptor read fail
    pub async fn set_descriptor_failure(&self, should_fail: bool) {
        self.inner.lock().await.fail_descriptor_reads = should_fail;
    }

    /// Queue a value for the next read of `characteristic`
    pub async fn push_read(&self, characteristic: Uuid, value: Vec<u8>) {
        self.inner
            .lock()
            .await
            .read_queues
            .entry(characteristic)
            .or_default()
            .push_back(value);
    }

    /// Install a responder invoked on every write
    pub async fn set_responder(&self, responder: MockResponder) {
        self.inner.lock().await.responder = Some(responder);
    }

    /// All writes so far as `(characteristic, data)` pairs
    pub async fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.inner.lock().await.writes.clone()
    }

    /// Total number of writes issued
    pub async fn write_count(&self) -> usize {
        self.inner.lock().await.writes.len()
    }

    /// Number of writes issued to one characteristic
    pub async fn write_count_for(&self, characteristic: Uuid) -> usize {
        self.inner
            .lock()
            .await
            .writes
            .iter()
            .filter(|(uuid, _)| *uuid == characteristic)
            .count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BleTransport for MockTransport {
    async fn scan(&self, _duration: Duration) -> TransportResult<Vec<DiscoveredDevice>> {
        Ok(self.inner.lock().await.devices.clone())
    }

    async fn connect(&self, _device_id: &str) -> TransportResult<()> {
        self.inner.lock().await.connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.inner.lock().await.connected = false;
        Ok(())
    }

    async fn discover_services(&self) -> TransportResult<()> {
        let state = self.inner.lock().await;
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }

    async fn services(&self) -> TransportResult<Vec<GattService>> {
        let state = self.inner.lock().await;
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        Ok(state.services.clone())
    }

    async fn write(&self, endpoint: &EndpointRef, data: &[u8]) -> TransportResult<()> {
        let mut state = self.inner.lock().await;
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.writes.push((endpoint.characteristic, data.to_vec()));
        if let Some(mut responder) = state.responder.take() {
            let response = responder(endpoint.characteristic, data);
            state.responder = Some(responder);
            if let Some(response) = response {
                state
                    .read_queues
                    .entry(endpoint.characteristic)
                    .or_default()
                    .push_back(response);
            }
        }
        Ok(())
    }

    async fn read(&self, endpoint: &EndpointRef) -> TransportResult<Vec<u8>> {
        let mut state = self.inner.lock().await;
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state
            .read_queues
            .get_mut(&endpoint.characteristic)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                TransportError::Operation(format!(
                    "nothing to read on characteristic {}",
                    endpoint.characteristic
                ))
            })
    }

    async fn read_descriptor(
        &self,
        _service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
    ) -> TransportResult<Vec<u8>> {
        let state = self.inner.lock().await;
        if state.fail_descriptor_reads {
            return Err(TransportError::DescriptorUnavailable {
                characteristic,
                descriptor,
            });
        }
        state
            .descriptor_values
            .get(&(characteristic, descriptor))
            .cloned()
            .ok_or(TransportError::DescriptorUnavailable {
                characteristic,
                descriptor,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(characteristic: Uuid) -> EndpointRef {
        EndpointRef {
            service: Uuid::from_u128(1),
            characteristic,
        }
    }

    #[tokio::test]
    async fn test_mock_read_queue() {
        let transport = MockTransport::new();
        transport.connect("device").await.unwrap();

        let characteristic = Uuid::from_u128(2);
        transport.push_read(characteristic, vec![1, 2, 3]).await;

        let target = endpoint(characteristic);
        assert_eq!(transport.read(&target).await.unwrap(), vec![1, 2, 3]);
        assert!(transport.read(&target).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_write_log() {
        let transport = MockTransport::new();
        transport.connect("device").await.unwrap();

        let characteristic = Uuid::from_u128(3);
        let target = endpoint(characteristic);
        transport.write(&target, b"hello").await.unwrap();
        transport.write(&target, b"again").await.unwrap();

        assert_eq!(transport.write_count().await, 2);
        assert_eq!(transport.write_count_for(characteristic).await, 2);
        assert_eq!(transport.writes().await[0].1, b"hello");
    }

    #[tokio::test]
    async fn test_mock_responder_round_trip() {
        let transport = MockTransport::new();
        transport.connect("device").await.unwrap();
        transport
            .set_responder(Box::new(|_, data| {
                let mut echoed = data.to_vec();
                echoed.reverse();
                Some(echoed)
            }))
            .await;

        let target = endpoint(Uuid::from_u128(4));
        transport.write(&target, &[1, 2, 3]).await.unwrap();
        assert_eq!(transport.read(&target).await.unwrap(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_mock_requires_connection() {
        let transport = MockTransport::new();
        let target = endpoint(Uuid::from_u128(5));
        assert!(matches!(
            transport.write(&target, b"x").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.services().await,
            Err(TransportError::NotConnected)
        ));
    }
}
