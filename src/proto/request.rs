//! Command payload encoders
//!
//! Each builder returns the complete envelope bytes for one request. The
//! session handshake sends these in the clear; everything else goes through
//! the session cipher first.

use super::fields;
use super::wire::{put_bytes_field, put_message_field, put_varint_field};

/// Scan start parameters sent with every [`scan_start`] command.
const SCAN_GROUP_CHANNELS: u64 = 5;
const SCAN_PERIOD_MS: u64 = 120;

fn sec1_envelope(msg: u64, body_field: u32, body: &[u8]) -> Vec<u8> {
    let mut sec1 = Vec::new();
    put_varint_field(&mut sec1, fields::SEC1_MSG, msg);
    put_message_field(&mut sec1, body_field, body);

    let mut outer = Vec::new();
    put_varint_field(&mut outer, fields::SESSION_SEC_VER, fields::SEC_SCHEME_1);
    put_message_field(&mut outer, fields::SESSION_SEC1_PAYLOAD, &sec1);
    outer
}

fn envelope(msg_field: u32, msg: u64, body_field: u32, body: &[u8]) -> Vec<u8> {
    let mut outer = Vec::new();
    put_varint_field(&mut outer, msg_field, msg);
    put_message_field(&mut outer, body_field, body);
    outer
}

/// Security1 command0: the client's ephemeral public key, unencrypted.
pub fn session_command0(client_pubkey: &[u8; 32]) -> Vec<u8> {
    let mut body = Vec::new();
    put_bytes_field(&mut body, fields::SESSION_CMD0_PUBKEY, client_pubkey);
    sec1_envelope(fields::SEC1_MSG_CMD0, fields::SEC1_BODY_CMD0, &body)
}

/// Security1 command1: the client verification data.
pub fn session_command1(client_verify: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    put_bytes_field(&mut body, fields::SESSION_CMD1_VERIFY, client_verify);
    sec1_envelope(fields::SEC1_MSG_CMD1, fields::SEC1_BODY_CMD1, &body)
}

/// Start a non-blocking Wi-Fi scan on the device.
pub fn scan_start() -> Vec<u8> {
    let mut body = Vec::new();
    put_varint_field(&mut body, fields::SCAN_START_BLOCKING, 0);
    put_varint_field(&mut body, fields::SCAN_START_PASSIVE, 0);
    put_varint_field(
        &mut body,
        fields::SCAN_START_GROUP_CHANNELS,
        SCAN_GROUP_CHANNELS,
    );
    put_varint_field(&mut body, fields::SCAN_START_PERIOD_MS, SCAN_PERIOD_MS);
    envelope(
        fields::SCAN_MSG,
        fields::SCAN_MSG_CMD_START,
        fields::SCAN_BODY_CMD_START,
        &body,
    )
}

/// Query scan progress.
pub fn scan_status() -> Vec<u8> {
    envelope(
        fields::SCAN_MSG,
        fields::SCAN_MSG_CMD_STATUS,
        fields::SCAN_BODY_CMD_STATUS,
        &[],
    )
}

/// Fetch `count` scan entries starting at `start_index`.
pub fn scan_result(start_index: u32, count: u32) -> Vec<u8> {
    let mut body = Vec::new();
    put_varint_field(
        &mut body,
        fields::SCAN_RESULT_START_INDEX,
        u64::from(start_index),
    );
    put_varint_field(&mut body, fields::SCAN_RESULT_COUNT, u64::from(count));
    envelope(
        fields::SCAN_MSG,
        fields::SCAN_MSG_CMD_RESULT,
        fields::SCAN_BODY_CMD_RESULT,
        &body,
    )
}

/// Hand Wi-Fi credentials to the device (not yet applied).
pub fn config_set(ssid: &str, passphrase: &str) -> Vec<u8> {
    let mut body = Vec::new();
    put_bytes_field(&mut body, fields::CFG_SET_SSID, ssid.as_bytes());
    put_bytes_field(&mut body, fields::CFG_SET_PASSPHRASE, passphrase.as_bytes());
    envelope(
        fields::CFG_MSG,
        fields::CFG_MSG_CMD_SET,
        fields::CFG_BODY_CMD_SET,
        &body,
    )
}

/// Tell the device to join the configured network.
pub fn config_apply() -> Vec<u8> {
    envelope(
        fields::CFG_MSG,
        fields::CFG_MSG_CMD_APPLY,
        fields::CFG_BODY_CMD_APPLY,
        &[],
    )
}

/// Request one station-state snapshot.
pub fn config_get_status() -> Vec<u8> {
    envelope(
        fields::CFG_MSG,
        fields::CFG_MSG_CMD_GET_STATUS,
        fields::CFG_BODY_CMD_GET_STATUS,
        &[],
    )
}

/// Factory-reset the device's Wi-Fi state.
pub fn ctrl_reset() -> Vec<u8> {
    envelope(
        fields::CTRL_MSG,
        fields::CTRL_MSG_CMD_RESET,
        fields::CTRL_BODY_CMD_RESET,
        &[],
    )
}

/// Restart provisioning on the device without a reboot.
pub fn ctrl_reprovision() -> Vec<u8> {
    envelope(
        fields::CTRL_MSG,
        fields::CTRL_MSG_CMD_REPROV,
        fields::CTRL_BODY_CMD_REPROV,
        &[],
    )
}
