//! Response payload decoders
//!
//! Strict unwrap of outer-then-inner envelopes. Every decoder validates the
//! message-type discriminant and fails fast with the unexpected value
//! embedded in the error. Device-level status words are returned to the
//! caller unjudged; mapping nonzero statuses to errors is the client's job.

use super::fields;
use super::wire::{RawMessage, to_signed_i32};
use crate::core::error::{CodecError, CodecResult};
use crate::core::types::{StaState, WifiScanEntry, WifiStatus};

fn check_msg_type(msg: &RawMessage, msg_field: u32, expected: u64) -> CodecResult<()> {
    let got = msg
        .varint_field(msg_field)
        .ok_or(CodecError::MissingField("message type"))?;
    if got != expected {
        return Err(CodecError::UnexpectedMessageType { expected, got });
    }
    Ok(())
}

fn inner_body(msg: &RawMessage, body_field: u32, what: &'static str) -> CodecResult<RawMessage> {
    let body = msg
        .bytes_field(body_field)
        .ok_or(CodecError::MissingField(what))?;
    RawMessage::decode(body)
}

/// Unwrap a session envelope down to the body carried for `expected` msg.
fn sec1_body(buf: &[u8], expected: u64, body_field: u32) -> CodecResult<RawMessage> {
    let outer = RawMessage::decode(buf)?;
    let sec1 = inner_body(&outer, fields::SESSION_SEC1_PAYLOAD, "sec1 payload")?;
    check_msg_type(&sec1, fields::SEC1_MSG, expected)?;
    inner_body(&sec1, body_field, "sec1 body")
}

/// Decoded Security1 response0.
///
/// Key material lengths are not validated here; the handshake rejects
/// anything that is not exactly 32/16 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResp0 {
    pub status: u32,
    pub device_pubkey: Vec<u8>,
    pub device_random: Vec<u8>,
}

pub fn decode_session_resp0(buf: &[u8]) -> CodecResult<SessionResp0> {
    let body = sec1_body(buf, fields::SEC1_MSG_RESP0, fields::SEC1_BODY_RESP0)?;
    Ok(SessionResp0 {
        status: body.varint_field(fields::SESSION_RESP0_STATUS).unwrap_or(0) as u32,
        device_pubkey: body
            .bytes_field(fields::SESSION_RESP0_PUBKEY)
            .ok_or(CodecError::MissingField("device public key"))?
            .to_vec(),
        device_random: body
            .bytes_field(fields::SESSION_RESP0_RANDOM)
            .ok_or(CodecError::MissingField("device random"))?
            .to_vec(),
    })
}

/// Decoded Security1 response1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResp1 {
    pub status: u32,
    pub device_verify: Vec<u8>,
}

pub fn decode_session_resp1(buf: &[u8]) -> CodecResult<SessionResp1> {
    let body = sec1_body(buf, fields::SEC1_MSG_RESP1, fields::SEC1_BODY_RESP1)?;
    Ok(SessionResp1 {
        status: body.varint_field(fields::SESSION_RESP1_STATUS).unwrap_or(0) as u32,
        device_verify: body
            .bytes_field(fields::SESSION_RESP1_VERIFY)
            .ok_or(CodecError::MissingField("device verify data"))?
            .to_vec(),
    })
}

/// Device status word from a scan-start acknowledgement.
pub fn decode_scan_start(buf: &[u8]) -> CodecResult<u32> {
    let outer = RawMessage::decode(buf)?;
    check_msg_type(&outer, fields::SCAN_MSG, fields::SCAN_MSG_RESP_START)?;
    Ok(outer.varint_field(fields::SCAN_STATUS).unwrap_or(0) as u32)
}

/// Decoded scan progress answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStatus {
    pub status: u32,
    pub finished: bool,
    pub result_count: u32,
}

pub fn decode_scan_status(buf: &[u8]) -> CodecResult<ScanStatus> {
    let outer = RawMessage::decode(buf)?;
    check_msg_type(&outer, fields::SCAN_MSG, fields::SCAN_MSG_RESP_STATUS)?;
    let body = inner_body(&outer, fields::SCAN_BODY_RESP_STATUS, "scan status body")?;
    Ok(ScanStatus {
        status: outer.varint_field(fields::SCAN_STATUS).unwrap_or(0) as u32,
        finished: body.varint_field(fields::SCAN_STATUS_FINISHED).unwrap_or(0) != 0,
        result_count: body
            .varint_field(fields::SCAN_STATUS_RESULT_COUNT)
            .unwrap_or(0) as u32,
    })
}

/// One fetched chunk of scan entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResults {
    pub status: u32,
    pub entries: Vec<WifiScanEntry>,
}

pub fn decode_scan_results(buf: &[u8]) -> CodecResult<ScanResults> {
    let outer = RawMessage::decode(buf)?;
    check_msg_type(&outer, fields::SCAN_MSG, fields::SCAN_MSG_RESP_RESULT)?;
    let body = inner_body(&outer, fields::SCAN_BODY_RESP_RESULT, "scan result body")?;

    let mut entries = Vec::new();
    for raw in body.bytes_fields(fields::SCAN_RESULT_ENTRY) {
        entries.push(decode_scan_entry(raw)?);
    }

    Ok(ScanResults {
        status: outer.varint_field(fields::SCAN_STATUS).unwrap_or(0) as u32,
        entries,
    })
}

fn decode_scan_entry(buf: &[u8]) -> CodecResult<WifiScanEntry> {
    let entry = RawMessage::decode(buf)?;
    Ok(WifiScanEntry {
        ssid: String::from_utf8_lossy(entry.bytes_field(fields::SCAN_ENTRY_SSID).unwrap_or(&[]))
            .into_owned(),
        bssid: hex::encode(entry.bytes_field(fields::SCAN_ENTRY_BSSID).unwrap_or(&[])),
        channel: entry.varint_field(fields::SCAN_ENTRY_CHANNEL).unwrap_or(0) as u32,
        rssi: to_signed_i32(entry.varint_field(fields::SCAN_ENTRY_RSSI).unwrap_or(0)),
        auth: entry.varint_field(fields::SCAN_ENTRY_AUTH).unwrap_or(0) as u32,
    })
}

fn decode_config_status_word(
    buf: &[u8],
    expected: u64,
    body_field: u32,
) -> CodecResult<u32> {
    let outer = RawMessage::decode(buf)?;
    check_msg_type(&outer, fields::CFG_MSG, expected)?;
    let body = inner_body(&outer, body_field, "config response body")?;
    Ok(body.varint_field(fields::CFG_RESP_STATUS).unwrap_or(0) as u32)
}

/// Device status word from a set-config acknowledgement.
pub fn decode_config_set(buf: &[u8]) -> CodecResult<u32> {
    decode_config_status_word(buf, fields::CFG_MSG_RESP_SET, fields::CFG_BODY_RESP_SET)
}

/// Device status word from an apply-config acknowledgement.
pub fn decode_config_apply(buf: &[u8]) -> CodecResult<u32> {
    decode_config_status_word(buf, fields::CFG_MSG_RESP_APPLY, fields::CFG_BODY_RESP_APPLY)
}

/// Decode a full Wi-Fi status snapshot.
pub fn decode_config_status(buf: &[u8]) -> CodecResult<WifiStatus> {
    let outer = RawMessage::decode(buf)?;
    check_msg_type(&outer, fields::CFG_MSG, fields::CFG_MSG_RESP_GET_STATUS)?;
    let body = inner_body(&outer, fields::CFG_BODY_RESP_GET_STATUS, "status body")?;

    let raw_state = body
        .varint_field(fields::CFG_STATUS_STA_STATE)
        .ok_or(CodecError::MissingField("station state"))?;
    let sta_state = StaState::try_from(raw_state as u32).map_err(|_| {
        CodecError::InvalidFieldValue {
            field: "station state",
            value: raw_state,
        }
    })?;

    let ip4_addr = match body.bytes_field(fields::CFG_STATUS_CONNECTED) {
        Some(raw) => RawMessage::decode(raw)?
            .bytes_field(fields::CFG_CONNECTED_IP4_ADDR)
            .map(|addr| String::from_utf8_lossy(addr).into_owned()),
        None => None,
    };

    let attempts_remaining = match body.bytes_field(fields::CFG_STATUS_ATTEMPT_FAILED) {
        Some(raw) => RawMessage::decode(raw)?
            .varint_field(fields::CFG_ATTEMPT_FAILED_REMAINING)
            .map(|v| v as u32),
        None => None,
    };

    Ok(WifiStatus {
        status: body.varint_field(fields::CFG_STATUS_STATUS).unwrap_or(0) as u32,
        sta_state,
        fail_reason: body
            .varint_field(fields::CFG_STATUS_FAIL_REASON)
            .map(|v| v as u32),
        attempts_remaining,
        ip4_addr,
    })
}

fn decode_ctrl(buf: &[u8], expected: u64) -> CodecResult<u32> {
    let outer = RawMessage::decode(buf)?;
    check_msg_type(&outer, fields::CTRL_MSG, expected)?;
    Ok(outer.varint_field(fields::CTRL_STATUS).unwrap_or(0) as u32)
}

/// Device status word from a reset acknowledgement.
pub fn decode_ctrl_reset(buf: &[u8]) -> CodecResult<u32> {
    decode_ctrl(buf, fields::CTRL_MSG_RESP_RESET)
}

/// Device status word from a reprovision acknowledgement.
pub fn decode_ctrl_reprovision(buf: &[u8]) -> CodecResult<u32> {
    decode_ctrl(buf, fields::CTRL_MSG_RESP_REPROV)
}
