//! Endpoint discovery: descriptor pass plus static fallback table
//!
//! Logical endpoint names map onto `(service, characteristic)` pairs. The
//! primary path reads each characteristic's user-description descriptor; a
//! fixed table of 16-bit UUID short codes fills whatever the descriptors
//! did not resolve. The directory is rebuilt from empty on every connect,
//! so stale mappings cannot leak across connections.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::DiscoveryError;
use crate::transport::ble::BleTransport;

/// Characteristic User Description descriptor (Bluetooth assigned number).
pub const USER_DESCRIPTION_DESCRIPTOR: Uuid =
    Uuid::from_u128(0x00002901_0000_1000_8000_00805f9b34fb);

/// Logical protocol channels, a fixed closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointName {
    Session,
    Config,
    ProtoVer,
    Scan,
    Ctrl,
    Hub,
}

impl EndpointName {
    /// Endpoints that must all resolve or discovery fails.
    pub const REQUIRED: [EndpointName; 3] = [
        EndpointName::Session,
        EndpointName::Config,
        EndpointName::ProtoVer,
    ];

    /// The name carried in the characteristic's user description.
    pub fn wire_name(self) -> &'static str {
        match self {
            EndpointName::Session => "prov-session",
            EndpointName::Config => "prov-config",
            EndpointName::ProtoVer => "proto-ver",
            EndpointName::Scan => "prov-scan",
            EndpointName::Ctrl => "prov-ctrl",
            EndpointName::Hub => "hub",
        }
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl FromStr for EndpointName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prov-session" => Ok(EndpointName::Session),
            "prov-config" => Ok(EndpointName::Config),
            "proto-ver" => Ok(EndpointName::ProtoVer),
            "prov-scan" => Ok(EndpointName::Scan),
            "prov-ctrl" => Ok(EndpointName::Ctrl),
            "hub" => Ok(EndpointName::Hub),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Fixed interop table of 16-bit characteristic UUID short codes.
///
/// These exact values are wire-compatible with deployed devices and must
/// not change.
pub const FALLBACK_SHORT_CODES: [(u16, EndpointName); 6] = [
    (0xff4f, EndpointName::Ctrl),
    (0xff50, EndpointName::Scan),
    (0xff51, EndpointName::Session),
    (0xff52, EndpointName::Config),
    (0xff53, EndpointName::ProtoVer),
    (0xff54, EndpointName::Hub),
];

/// The 16-bit short code embedded in a characteristic UUID: the low 16 bits
/// of the first 32-bit group. Matches both Bluetooth-base (`0000ff51-…`)
/// and vendor-prefixed (`xxxxff51-…`) UUIDs.
fn short_code(uuid: Uuid) -> u16 {
    (uuid.as_fields().0 & 0xffff) as u16
}

fn fallback_name(code: u16) -> Option<EndpointName> {
    FALLBACK_SHORT_CODES
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, name)| *name)
}

/// Transport-level address of one endpoint.
///
/// Created during discovery and replaced wholesale on every connection,
/// never merged across connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointRef {
    pub service: Uuid,
    pub characteristic: Uuid,
}

/// Maps logical endpoint names to their transport addresses for exactly one
/// connection.
#[derive(Debug, Clone, Default)]
pub struct EndpointDirectory {
    endpoints: HashMap<EndpointName, EndpointRef>,
}

impl EndpointDirectory {
    pub fn contains(&self, name: EndpointName) -> bool {
        self.endpoints.contains_key(&name)
    }

    pub fn get(&self, name: EndpointName) -> Option<&EndpointRef> {
        self.endpoints.get(&name)
    }

    /// Resolve `name` or fail loudly; callers must not fall through to an
    /// unmapped endpoint.
    pub fn require(&self, name: EndpointName) -> Result<EndpointRef, DiscoveryError> {
        self.endpoints
            .get(&name)
            .copied()
            .ok_or(DiscoveryError::EndpointNotMapped(name.wire_name()))
    }

    /// Wire names of every mapped endpoint, sorted for stable diagnostics.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .endpoints
            .keys()
            .map(|name| name.wire_name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    fn insert_if_absent(&mut self, name: EndpointName, endpoint: EndpointRef) {
        self.endpoints.entry(name).or_insert(endpoint);
    }

    fn has_all_required(&self) -> bool {
        EndpointName::REQUIRED
            .iter()
            .all(|name| self.endpoints.contains_key(name))
    }
}

/// Run both discovery passes against the connected device's GATT tree.
pub async fn build_directory<T: BleTransport>(
    transport: &T,
) -> Result<EndpointDirectory, DiscoveryError> {
    let services = transport.services().await?;
    let mut directory = EndpointDirectory::default();

    // Descriptor pass: best-effort, a single unreadable descriptor must not
    // abort discovery.
    for service in &services {
        for characteristic in &service.characteristics {
            match transport
                .read_descriptor(service.uuid, characteristic.uuid, USER_DESCRIPTION_DESCRIPTOR)
                .await
            {
                Ok(raw) => {
                    let text = String::from_utf8_lossy(&raw);
                    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
                    if let Ok(name) = text.parse::<EndpointName>() {
                        directory.insert_if_absent(
                            name,
                            EndpointRef {
                                service: service.uuid,
                                characteristic: characteristic.uuid,
                            },
                        );
                    }
                }
                Err(err) => {
                    debug!(
                        characteristic = %characteristic.uuid,
                        error = %err,
                        "user description unreadable, continuing"
                    );
                }
            }
        }
    }

    // Fallback pass: fill still-missing entries from the short-code table.
    if !directory.has_all_required() {
        for service in &services {
            for characteristic in &service.characteristics {
                if let Some(name) = fallback_name(short_code(characteristic.uuid)) {
                    directory.insert_if_absent(
                        name,
                        EndpointRef {
                            service: service.uuid,
                            characteristic: characteristic.uuid,
                        },
                    );
                }
            }
        }
    }

    if !directory.has_all_required() {
        return Err(DiscoveryError::MissingEndpoints {
            found: directory.names(),
        });
    }

    info!(endpoints = directory.len(), "endpoint directory built");
    Ok(directory)
}
