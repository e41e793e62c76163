//! Core provisioning logic: endpoint discovery, device RPCs, domain types

pub mod client;
pub mod discovery;
pub mod error;
pub mod types;
