//! Device RPC client: the provisioning orchestrator
//!
//! One [`ProvisioningClient`] instance equals one physical connection: the
//! only constructor connects and discovers, `disconnect` consumes the
//! client, and dropping it invalidates directory and session together.
//! Every RPC takes `&mut self`, so concurrent in-flight calls against one
//! session are impossible; the session cipher's keystream depends on it.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::core::discovery::{EndpointDirectory, EndpointName, build_directory};
use crate::core::error::{DeviceError, ProvisioningError, ProvisioningResult, SessionError};
use crate::core::types::{
    DiscoveredDevice, HubConfigPayload, HubConfigResponse, ProtocolInfo, StaState, WifiScanEntry,
    WifiStatus,
};
use crate::proto::{request, response};
use crate::session::cipher::SessionCipher;
use crate::session::handshake::Security1Handshake;
use crate::transport::ble::BleTransport;

const SCAN_STATUS_ATTEMPTS: u32 = 10;
const SCAN_STATUS_INTERVAL: Duration = Duration::from_millis(500);
const SCAN_RESULT_CHUNK: u32 = 4;
const MIN_WAIT_TIMEOUT: Duration = Duration::from_millis(1000);
const MIN_WAIT_INTERVAL: Duration = Duration::from_millis(500);
const PROTO_VER_PROBE: &[u8] = b"ver";
const DEVICE_NAME_PREFIXES: [&str; 2] = ["prov_", "prov-"];

/// Options for [`ProvisioningClient::wait_for_wifi_connection`].
#[derive(Debug, Default)]
pub struct WaitOptions {
    /// Overall budget; clamped to a 1 s floor.
    pub timeout: Duration,
    /// Delay between polls; clamped to a 500 ms floor.
    pub interval: Duration,
    /// Receives every raw status snapshot as it is polled.
    pub progress: Option<mpsc::UnboundedSender<WifiStatus>>,
}

/// Outcome of a connection wait. Deadline expiry is a value, not an error,
/// so callers can re-prompt (wrong passphrase) instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionWait {
    pub connected: bool,
    pub last_status: Option<WifiStatus>,
}

/// Scan a window and keep devices advertising a provisioning name.
///
/// Names beginning (case-insensitively) with `prov_` or `prov-` match;
/// when nothing matches, the unfiltered list is returned instead of an
/// empty one.
pub async fn find_provisionable_devices<T: BleTransport>(
    transport: &T,
    duration: Duration,
) -> ProvisioningResult<Vec<DiscoveredDevice>> {
    let devices = transport.scan(duration).await?;

    let matching: Vec<DiscoveredDevice> = devices
        .iter()
        .filter(|device| {
            device.name.as_deref().is_some_and(|name| {
                let name = name.to_ascii_lowercase();
                DEVICE_NAME_PREFIXES
                    .iter()
                    .any(|prefix| name.starts_with(prefix))
            })
        })
        .cloned()
        .collect();

    if matching.is_empty() {
        Ok(devices)
    } else {
        Ok(matching)
    }
}

/// Client for one connected provisioning device.
pub struct ProvisioningClient<T: BleTransport> {
    transport: T,
    directory: EndpointDirectory,
    session: Option<SessionCipher>,
}

impl<T: BleTransport> std::fmt::Debug for ProvisioningClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningClient")
            .field("directory", &self.directory)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<T: BleTransport> ProvisioningClient<T> {
    /// Connect to `device_id`, resolve its GATT tree and build the endpoint
    /// directory. The only way to obtain a client.
    pub async fn connect(transport: T, device_id: &str) -> ProvisioningResult<Self> {
        transport.connect(device_id).await?;
        transport.discover_services().await?;

        let directory = match build_directory(&transport).await {
            Ok(directory) => directory,
            Err(err) => {
                let _ = transport.disconnect().await;
                return Err(err.into());
            }
        };

        info!(device = device_id, "provisioning client connected");
        Ok(Self {
            transport,
            directory,
            session: None,
        })
    }

    /// Tear down the connection; directory and session die with the client.
    pub async fn disconnect(self) -> ProvisioningResult<()> {
        self.transport.disconnect().await?;
        Ok(())
    }

    /// Whether the connected device exposes `name`.
    pub fn has_endpoint(&self, name: EndpointName) -> bool {
        self.directory.contains(name)
    }

    /// Unencrypted probe of the `proto-ver` endpoint.
    pub async fn protocol_info(&mut self) -> ProvisioningResult<ProtocolInfo> {
        let raw = self
            .call(EndpointName::ProtoVer, PROTO_VER_PROBE, false)
            .await?;
        let info = ProtocolInfo::parse(&raw);
        debug!(version = %info.version, "protocol info read");
        Ok(info)
    }

    /// Run the Security1 handshake and store the verified session cipher.
    pub async fn establish_session(&mut self, pop: &str) -> ProvisioningResult<()> {
        self.session = None;

        let handshake = Security1Handshake::new(pop);
        let command0 = handshake.command0();
        let response0 = self.call(EndpointName::Session, &command0, false).await?;
        let mut exchanged = handshake.process_response0(&response0)?;

        let command1 = exchanged.command1();
        let response1 = self.call(EndpointName::Session, &command1, false).await?;
        let cipher = exchanged.process_response1(&response1)?;

        info!("security1 session verified");
        self.session = Some(cipher);
        Ok(())
    }

    /// Scan for Wi-Fi networks visible to the device.
    ///
    /// No-op (`Ok(vec![])`) when the device has no `prov-scan` endpoint.
    /// Results are deduplicated by SSID (strongest RSSI wins) and sorted
    /// RSSI-descending with SSID-ascending tiebreak.
    pub async fn scan_wifi_networks(&mut self) -> ProvisioningResult<Vec<WifiScanEntry>> {
        if !self.directory.contains(EndpointName::Scan) {
            debug!("device exposes no scan endpoint, skipping Wi-Fi scan");
            return Ok(Vec::new());
        }

        let ack = self
            .call(EndpointName::Scan, &request::scan_start(), true)
            .await?;
        let status = response::decode_scan_start(&ack)?;
        if status != 0 {
            return Err(DeviceError::ScanStart(status).into());
        }

        let mut result_count = None;
        for attempt in 0..SCAN_STATUS_ATTEMPTS {
            let raw = self
                .call(EndpointName::Scan, &request::scan_status(), true)
                .await?;
            let progress = response::decode_scan_status(&raw)?;
            if progress.status != 0 {
                return Err(DeviceError::ScanStatus(progress.status).into());
            }
            if progress.finished {
                debug!(
                    attempt,
                    networks = progress.result_count,
                    "device scan finished"
                );
                result_count = Some(progress.result_count);
                break;
            }
            sleep(SCAN_STATUS_INTERVAL).await;
        }
        let Some(result_count) = result_count else {
            return Err(ProvisioningError::ScanTimeout);
        };

        let mut entries = Vec::new();
        let mut offset = 0u32;
        while offset < result_count {
            let count = SCAN_RESULT_CHUNK.min(result_count - offset);
            let raw = self
                .call(EndpointName::Scan, &request::scan_result(offset, count), true)
                .await?;
            let chunk = response::decode_scan_results(&raw)?;
            if chunk.status != 0 {
                return Err(DeviceError::ScanResult(chunk.status).into());
            }
            entries.extend(chunk.entries);
            offset += count;
        }

        Ok(dedup_and_sort(entries))
    }

    /// Hand Wi-Fi credentials to the device (not yet applied).
    pub async fn send_wifi_config(
        &mut self,
        ssid: &str,
        passphrase: &str,
    ) -> ProvisioningResult<()> {
        let raw = self
            .call(EndpointName::Config, &request::config_set(ssid, passphrase), true)
            .await?;
        let status = response::decode_config_set(&raw)?;
        if status != 0 {
            return Err(DeviceError::SetConfig(status).into());
        }
        Ok(())
    }

    /// Tell the device to join the configured network.
    pub async fn apply_wifi_config(&mut self) -> ProvisioningResult<()> {
        let raw = self
            .call(EndpointName::Config, &request::config_apply(), true)
            .await?;
        let status = response::decode_config_apply(&raw)?;
        if status != 0 {
            return Err(DeviceError::ApplyConfig(status).into());
        }
        Ok(())
    }

    /// One independent Wi-Fi status snapshot.
    pub async fn fetch_wifi_status(&mut self) -> ProvisioningResult<WifiStatus> {
        let raw = self
            .call(EndpointName::Config, &request::config_get_status(), true)
            .await?;
        let status = response::decode_config_status(&raw)?;
        if status.status != 0 {
            return Err(DeviceError::GetStatus(status.status).into());
        }
        Ok(status)
    }

    /// Poll the device until it connects, terminally fails, or the deadline
    /// expires.
    pub async fn wait_for_wifi_connection(
        &mut self,
        options: WaitOptions,
    ) -> ProvisioningResult<ConnectionWait> {
        let timeout = options.timeout.max(MIN_WAIT_TIMEOUT);
        let interval = options.interval.max(MIN_WAIT_INTERVAL);
        let deadline = Instant::now() + timeout;

        let mut last_status = None;
        while Instant::now() < deadline {
            let status = self.fetch_wifi_status().await?;
            if let Some(progress) = &options.progress {
                let _ = progress.send(status.clone());
            }
            let state = status.sta_state;
            last_status = Some(status);

            match state {
                StaState::Connected => {
                    return Ok(ConnectionWait {
                        connected: true,
                        last_status,
                    });
                }
                StaState::ConnectionFailed => {
                    warn!("device reported terminal connection failure");
                    return Ok(ConnectionWait {
                        connected: false,
                        last_status,
                    });
                }
                StaState::Connecting | StaState::Disconnected => {}
            }

            sleep(interval).await;
        }

        Ok(ConnectionWait {
            connected: false,
            last_status,
        })
    }

    /// Send hub connection settings.
    ///
    /// `Ok(None)` without any transport write when the `hub` endpoint is
    /// absent or the payload is empty after trimming. A malformed JSON
    /// response becomes `{ok: false, status: "invalid_response"}`.
    pub async fn send_hub_config(
        &mut self,
        payload: &HubConfigPayload,
    ) -> ProvisioningResult<Option<HubConfigResponse>> {
        if !self.directory.contains(EndpointName::Hub) || payload.is_empty() {
            debug!("hub config skipped, nothing to send");
            return Ok(None);
        }

        let body = serde_json::to_vec(payload)?;
        let raw = self.call(EndpointName::Hub, &body, true).await?;

        let parsed = serde_json::from_slice(&raw).unwrap_or_else(|err| {
            warn!(error = %err, "hub response was not valid JSON");
            HubConfigResponse::invalid_response()
        });
        Ok(Some(parsed))
    }

    /// Factory-reset the device's Wi-Fi state. `Ok(false)` no-op when the
    /// device has no control endpoint.
    pub async fn ctrl_reset(&mut self) -> ProvisioningResult<bool> {
        if !self.directory.contains(EndpointName::Ctrl) {
            return Ok(false);
        }
        let raw = self
            .call(EndpointName::Ctrl, &request::ctrl_reset(), true)
            .await?;
        let status = response::decode_ctrl_reset(&raw)?;
        if status != 0 {
            return Err(DeviceError::Ctrl(status).into());
        }
        Ok(true)
    }

    /// Restart provisioning on the device without a reboot. `Ok(false)`
    /// no-op when the device has no control endpoint.
    pub async fn ctrl_reprovision(&mut self) -> ProvisioningResult<bool> {
        if !self.directory.contains(EndpointName::Ctrl) {
            return Ok(false);
        }
        let raw = self
            .call(EndpointName::Ctrl, &request::ctrl_reprovision(), true)
            .await?;
        let status = response::decode_ctrl_reprovision(&raw)?;
        if status != 0 {
            return Err(DeviceError::Ctrl(status).into());
        }
        Ok(true)
    }

    /// One request/response round-trip through the directory, encrypted
    /// when the operation requires the session.
    async fn call(
        &mut self,
        name: EndpointName,
        payload: &[u8],
        encrypted: bool,
    ) -> ProvisioningResult<Vec<u8>> {
        let endpoint = self.directory.require(name)?;

        let outgoing = if encrypted {
            let cipher = self.session.as_mut().ok_or(SessionError::NotEstablished)?;
            cipher.encrypt(payload)
        } else {
            payload.to_vec()
        };

        self.transport.write(&endpoint, &outgoing).await?;
        let incoming = self.transport.read(&endpoint).await?;

        if encrypted {
            let cipher = self.session.as_mut().ok_or(SessionError::NotEstablished)?;
            Ok(cipher.decrypt(&incoming))
        } else {
            Ok(incoming)
        }
    }
}

/// Deduplicate by SSID keeping the numerically larger RSSI, then sort
/// RSSI-descending with ascending-SSID tiebreak for deterministic display.
fn dedup_and_sort(entries: Vec<WifiScanEntry>) -> Vec<WifiScanEntry> {
    let mut best: HashMap<String, WifiScanEntry> = HashMap::new();
    for entry in entries {
        match best.get(&entry.ssid) {
            Some(current) if current.rssi >= entry.rssi => {}
            _ => {
                best.insert(entry.ssid.clone(), entry);
            }
        }
    }

    let mut sorted: Vec<WifiScanEntry> = best.into_values().collect();
    sorted.sort_by(|a, b| b.rssi.cmp(&a.rssi).then_with(|| a.ssid.cmp(&b.ssid)));
    sorted
}
