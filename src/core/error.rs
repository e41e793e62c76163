//! Error types for the provisioning client

use thiserror::Error;
use uuid::Uuid;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for wire codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type for client operations
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// Errors from the BLE transport layer
///
/// These propagate unwrapped; the client adds no retries around them.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("BLE stack error: {0}")]
    Ble(#[from] bluer::Error),

    #[error("not connected to a device")]
    NotConnected,

    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    #[error("characteristic {characteristic} in service {service} not present on device")]
    CharacteristicMissing { service: Uuid, characteristic: Uuid },

    #[error("descriptor {descriptor} on characteristic {characteristic} unavailable")]
    DescriptorUnavailable {
        characteristic: Uuid,
        descriptor: Uuid,
    },

    #[error("BLE operation failed: {0}")]
    Operation(String),
}

/// Errors from the strict binary wire codec
///
/// Decoding is fail-fast; structurally invalid input is never partially
/// decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated varint: buffer ended with continuation bit set")]
    TruncatedVarint,

    #[error("varint overflow: value does not terminate within 10 bytes")]
    VarintOverflow,

    #[error("unsupported wire type {0}")]
    UnsupportedWireType(u8),

    #[error("length-delimited field of {declared} bytes exceeds remaining {remaining} bytes")]
    TruncatedField { declared: u64, remaining: usize },

    #[error("unexpected message type: expected {expected}, got {got}")]
    UnexpectedMessageType { expected: u64, got: u64 },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value {value} for {field}")]
    InvalidFieldValue { field: &'static str, value: u64 },
}

/// Errors from the Security1 handshake
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session setup failed at command0, device status {0}")]
    Command0Failed(u32),

    #[error("session setup failed at command1, device status {0}")]
    Command1Failed(u32),

    #[error("device public key must be 32 bytes, got {0}")]
    InvalidDevicePublicKey(usize),

    #[error("device random must be 16 bytes, got {0}")]
    InvalidDeviceRandom(usize),

    #[error("device verify data mismatch: wrong proof of possession or impersonating peer")]
    VerificationMismatch,

    #[error("no verified session; establish one before issuing encrypted calls")]
    NotEstablished,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors from endpoint discovery
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("required endpoints unresolved after discovery; found: [{}]", .found.join(", "))]
    MissingEndpoints { found: Vec<String> },

    #[error("endpoint {0} not available on this device")]
    EndpointNotMapped(&'static str),

    #[error("transport failure during discovery: {0}")]
    Transport(#[from] TransportError),
}

/// Nonzero device status returned by a post-handshake RPC
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device rejected scan start, status {0}")]
    ScanStart(u32),

    #[error("device rejected scan status query, status {0}")]
    ScanStatus(u32),

    #[error("device rejected scan result fetch, status {0}")]
    ScanResult(u32),

    #[error("device rejected Wi-Fi configuration, status {0}")]
    SetConfig(u32),

    #[error("device failed to apply Wi-Fi configuration, status {0}")]
    ApplyConfig(u32),

    #[error("device rejected status query, status {0}")]
    GetStatus(u32),

    #[error("device rejected control command, status {0}")]
    Ctrl(u32),
}

/// Umbrella error for client operations
#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Wi-Fi scan did not complete")]
    ScanTimeout,

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
