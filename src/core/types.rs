//! Domain types for device provisioning
//!
//! The binary framing in `proto` is strict; the JSON envelopes here
//! (protocol info, hub config) are deliberately lenient. Keep the two apart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A device seen during a BLE scan window.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Transport-level device identifier (Bluetooth address)
    pub id: String,
    /// Advertised name, if any
    pub name: Option<String>,
    /// Advertising RSSI in dBm
    pub rssi: Option<i16>,
}

/// Snapshot of one remote GATT service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<GattCharacteristic>,
}

/// Snapshot of one remote GATT characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    pub uuid: Uuid,
    pub descriptors: Vec<Uuid>,
}

/// One Wi-Fi network reported by the device's scan.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WifiScanEntry {
    /// Network SSID
    pub ssid: String,
    /// BSSID as lowercase hex
    pub bssid: String,
    /// Channel number
    pub channel: u32,
    /// Signal strength in dBm
    pub rssi: i32,
    /// Authentication mode as reported by the device
    pub auth: u32,
}

/// The device's classification of its Wi-Fi client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StaState {
    Connected = 0,
    Connecting = 1,
    Disconnected = 2,
    ConnectionFailed = 3,
}

impl TryFrom<u32> for StaState {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, <Self as TryFrom<u32>>::Error> {
        match value {
            0 => Ok(StaState::Connected),
            1 => Ok(StaState::Connecting),
            2 => Ok(StaState::Disconnected),
            3 => Ok(StaState::ConnectionFailed),
            _ => Err(()),
        }
    }
}

/// One polled Wi-Fi status snapshot; the protocol layer keeps no history.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WifiStatus {
    /// Raw device status for the query itself
    pub status: u32,
    /// Station state
    pub sta_state: StaState,
    /// Failure reason, present when the device reports one
    pub fail_reason: Option<u32>,
    /// Remaining connection attempts, present after a failed attempt
    pub attempts_remaining: Option<u32>,
    /// Assigned IPv4 address, present once connected
    pub ip4_addr: Option<String>,
}

/// Protocol version and capabilities read from `proto-ver`.
///
/// Parsed best-effort from the JSON envelope `{"prov":{"ver":…,"cap":[…]}}`;
/// on any parse failure `version` falls back to the trimmed raw text and
/// `capabilities` is empty. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub version: String,
    pub capabilities: Vec<String>,
    pub raw: String,
}

impl ProtocolInfo {
    pub fn parse(raw_bytes: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(raw_bytes).into_owned();

        let parsed = serde_json::from_str::<serde_json::Value>(&raw)
            .ok()
            .and_then(|value| {
                let prov = value.get("prov")?;
                let version = prov.get("ver")?.as_str()?.to_string();
                let capabilities = prov
                    .get("cap")
                    .and_then(|cap| cap.as_array())
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(|entry| entry.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                Some((version, capabilities))
            });

        match parsed {
            Some((version, capabilities)) => Self {
                version,
                capabilities,
                raw,
            },
            None => Self {
                version: raw.trim().to_string(),
                capabilities: Vec::new(),
                raw,
            },
        }
    }
}

/// Hub connection settings sent to the `hub` endpoint.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HubConfigPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mqtt_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_url: Option<String>,
}

impl HubConfigPayload {
    /// True when both fields are absent or blank after trimming; an empty
    /// payload makes no network call at all.
    pub fn is_empty(&self) -> bool {
        fn blank(field: &Option<String>) -> bool {
            field.as_deref().is_none_or(|s| s.trim().is_empty())
        }
        blank(&self.mqtt_uri) && blank(&self.hub_url)
    }
}

/// The device's answer to a hub configuration, parsed leniently.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct HubConfigResponse {
    pub ok: bool,
    pub status: String,
    pub mqtt_uri: Option<String>,
    pub hub_url: Option<String>,
}

impl Default for HubConfigResponse {
    fn default() -> Self {
        Self {
            ok: false,
            status: String::new(),
            mqtt_uri: None,
            hub_url: None,
        }
    }
}

impl HubConfigResponse {
    /// Stand-in for a response that was not valid JSON.
    pub fn invalid_response() -> Self {
        Self {
            ok: false,
            status: "invalid_response".to_string(),
            mqtt_uri: None,
            hub_url: None,
        }
    }
}
