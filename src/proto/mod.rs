//! Binary protocol payloads for the provisioning endpoint family
//!
//! Every message on the wire is a composition of the codec in [`wire`]: an
//! outer envelope carrying a message-type discriminant plus one
//! length-delimited body, and an inner body message with its own numbered
//! fields. Encoders build inner-then-outer; decoders unwrap outer-then-inner
//! and validate the discriminant at each step.

pub mod request;
pub mod response;
pub mod wire;

/// Field numbers and message-type discriminants shared by the encoders and
/// decoders.
pub(crate) mod fields {
    // Session envelope (prov-session)
    pub const SESSION_SEC_VER: u32 = 2;
    pub const SESSION_SEC1_PAYLOAD: u32 = 11;
    pub const SEC_SCHEME_1: u64 = 1;

    pub const SEC1_MSG: u32 = 1;
    pub const SEC1_MSG_CMD0: u64 = 0;
    pub const SEC1_MSG_RESP0: u64 = 1;
    pub const SEC1_MSG_CMD1: u64 = 2;
    pub const SEC1_MSG_RESP1: u64 = 3;
    pub const SEC1_BODY_CMD0: u32 = 20;
    pub const SEC1_BODY_RESP0: u32 = 21;
    pub const SEC1_BODY_CMD1: u32 = 22;
    pub const SEC1_BODY_RESP1: u32 = 23;

    pub const SESSION_CMD0_PUBKEY: u32 = 1;
    pub const SESSION_RESP0_STATUS: u32 = 1;
    pub const SESSION_RESP0_PUBKEY: u32 = 2;
    pub const SESSION_RESP0_RANDOM: u32 = 3;
    pub const SESSION_CMD1_VERIFY: u32 = 1;
    pub const SESSION_RESP1_STATUS: u32 = 1;
    pub const SESSION_RESP1_VERIFY: u32 = 2;

    // Wi-Fi scan envelope (prov-scan)
    pub const SCAN_MSG: u32 = 1;
    pub const SCAN_STATUS: u32 = 2;
    pub const SCAN_MSG_CMD_START: u64 = 0;
    pub const SCAN_MSG_RESP_START: u64 = 1;
    pub const SCAN_MSG_CMD_STATUS: u64 = 2;
    pub const SCAN_MSG_RESP_STATUS: u64 = 3;
    pub const SCAN_MSG_CMD_RESULT: u64 = 4;
    pub const SCAN_MSG_RESP_RESULT: u64 = 5;
    pub const SCAN_BODY_CMD_START: u32 = 10;
    pub const SCAN_BODY_CMD_STATUS: u32 = 12;
    pub const SCAN_BODY_RESP_STATUS: u32 = 13;
    pub const SCAN_BODY_CMD_RESULT: u32 = 14;
    pub const SCAN_BODY_RESP_RESULT: u32 = 15;

    pub const SCAN_START_BLOCKING: u32 = 1;
    pub const SCAN_START_PASSIVE: u32 = 2;
    pub const SCAN_START_GROUP_CHANNELS: u32 = 3;
    pub const SCAN_START_PERIOD_MS: u32 = 4;
    pub const SCAN_STATUS_FINISHED: u32 = 1;
    pub const SCAN_STATUS_RESULT_COUNT: u32 = 2;
    pub const SCAN_RESULT_START_INDEX: u32 = 1;
    pub const SCAN_RESULT_COUNT: u32 = 2;
    pub const SCAN_RESULT_ENTRY: u32 = 1;
    pub const SCAN_ENTRY_SSID: u32 = 1;
    pub const SCAN_ENTRY_CHANNEL: u32 = 2;
    pub const SCAN_ENTRY_RSSI: u32 = 3;
    pub const SCAN_ENTRY_BSSID: u32 = 4;
    pub const SCAN_ENTRY_AUTH: u32 = 5;

    // Wi-Fi config envelope (prov-config)
    pub const CFG_MSG: u32 = 1;
    pub const CFG_MSG_CMD_GET_STATUS: u64 = 0;
    pub const CFG_MSG_RESP_GET_STATUS: u64 = 1;
    pub const CFG_MSG_CMD_SET: u64 = 2;
    pub const CFG_MSG_RESP_SET: u64 = 3;
    pub const CFG_MSG_CMD_APPLY: u64 = 4;
    pub const CFG_MSG_RESP_APPLY: u64 = 5;
    pub const CFG_BODY_CMD_GET_STATUS: u32 = 10;
    pub const CFG_BODY_RESP_GET_STATUS: u32 = 11;
    pub const CFG_BODY_CMD_SET: u32 = 12;
    pub const CFG_BODY_RESP_SET: u32 = 13;
    pub const CFG_BODY_CMD_APPLY: u32 = 14;
    pub const CFG_BODY_RESP_APPLY: u32 = 15;

    pub const CFG_SET_SSID: u32 = 1;
    pub const CFG_SET_PASSPHRASE: u32 = 2;
    pub const CFG_STATUS_STATUS: u32 = 1;
    pub const CFG_STATUS_STA_STATE: u32 = 2;
    pub const CFG_STATUS_FAIL_REASON: u32 = 10;
    pub const CFG_STATUS_CONNECTED: u32 = 11;
    pub const CFG_STATUS_ATTEMPT_FAILED: u32 = 12;
    pub const CFG_CONNECTED_IP4_ADDR: u32 = 1;
    pub const CFG_ATTEMPT_FAILED_REMAINING: u32 = 1;
    pub const CFG_RESP_STATUS: u32 = 1;

    // Control envelope (prov-ctrl)
    pub const CTRL_MSG: u32 = 1;
    pub const CTRL_STATUS: u32 = 2;
    pub const CTRL_MSG_CMD_RESET: u64 = 0;
    pub const CTRL_MSG_RESP_RESET: u64 = 1;
    pub const CTRL_MSG_CMD_REPROV: u64 = 2;
    pub const CTRL_MSG_RESP_REPROV: u64 = 3;
    pub const CTRL_BODY_CMD_RESET: u32 = 10;
    pub const CTRL_BODY_CMD_REPROV: u32 = 12;
}
