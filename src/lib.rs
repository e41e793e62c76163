//! BLE Provisioning Client
//!
//! A client library for provisioning Wi-Fi credentials onto BLE devices:
//! - GATT endpoint discovery (descriptor names with a static fallback table)
//! - Security1 proof-of-possession handshake (X25519 + AES-256-CTR)
//! - Device RPCs: Wi-Fi scan, credential configuration, status polling,
//!   hub configuration and device control

pub mod config;
pub mod core;
pub mod proto;
pub mod session;
pub mod transport;

pub use crate::core::{
    client::{ConnectionWait, ProvisioningClient, WaitOptions, find_provisionable_devices},
    discovery::{EndpointDirectory, EndpointName, EndpointRef},
    error::{
        CodecError, DeviceError, DiscoveryError, ProvisioningError, SessionError, TransportError,
    },
    types::{
        DiscoveredDevice, HubConfigPayload, HubConfigResponse, ProtocolInfo, StaState,
        WifiScanEntry, WifiStatus,
    },
};
pub use crate::transport::{BleTransport, BluerTransport};
