//! BLE transport abstraction layer

pub mod ble;
pub mod bluer_transport;
pub mod mock;

pub use ble::BleTransport;
pub use bluer_transport::BluerTransport;

#[cfg(test)]
pub use mock::MockTransport;
