//! Security1 proof-of-possession handshake
//!
//! Typestate flow `Security1Handshake` → [`KeyExchanged`] →
//! [`SessionCipher`]: command0 carries the client's ephemeral X25519 public
//! key, response0 the device key material, command1/response1 the mutual
//! verification data. Any failure consumes the state; there is no way to
//! reach the cipher without a verified exchange.
//!
//! Key derivation: session key = X25519 shared secret XOR SHA-256(PoP),
//! cipher = AES-256-CTR keyed with it and IV = device random. The client
//! verify data is the encryption of the device public key (keystream bytes
//! 0..32); the device verify data must decrypt (bytes 32..64) to the client
//! public key.

use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::debug;
use x25519_dalek::{EphemeralSecret, PublicKey};

use crate::core::error::SessionError;
use crate::proto::{request, response};
use crate::session::cipher::SessionCipher;

const DEVICE_PUBKEY_LEN: usize = 32;
const DEVICE_RANDOM_LEN: usize = 16;

/// Handshake state before any message exchange.
pub struct Security1Handshake {
    secret: EphemeralSecret,
    client_public: [u8; 32],
    pop_hash: [u8; 32],
}

impl Security1Handshake {
    /// Create a fresh handshake from the proof-of-possession secret.
    ///
    /// An empty PoP is still hashed.
    pub fn new(pop: &str) -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let client_public = PublicKey::from(&secret).to_bytes();
        let pop_hash = Sha256::digest(pop.as_bytes()).into();
        Self {
            secret,
            client_public,
            pop_hash,
        }
    }

    /// The client's ephemeral public key.
    pub fn client_public_key(&self) -> [u8; 32] {
        self.client_public
    }

    /// Envelope bytes for command0 (sent unencrypted to `prov-session`).
    pub fn command0(&self) -> Vec<u8> {
        request::session_command0(&self.client_public)
    }

    /// Consume the device's response0 and derive the session key.
    ///
    /// Rejects key material that is not exactly its fixed length even when
    /// the device status is zero; a short key would silently weaken the
    /// exchange.
    pub fn process_response0(self, payload: &[u8]) -> Result<KeyExchanged, SessionError> {
        let resp = response::decode_session_resp0(payload)?;

        if resp.device_pubkey.len() != DEVICE_PUBKEY_LEN {
            return Err(SessionError::InvalidDevicePublicKey(
                resp.device_pubkey.len(),
            ));
        }
        if resp.device_random.len() != DEVICE_RANDOM_LEN {
            return Err(SessionError::InvalidDeviceRandom(resp.device_random.len()));
        }
        if resp.status != 0 {
            return Err(SessionError::Command0Failed(resp.status));
        }

        let mut device_pubkey = [0u8; DEVICE_PUBKEY_LEN];
        device_pubkey.copy_from_slice(&resp.device_pubkey);
        let mut iv = [0u8; DEVICE_RANDOM_LEN];
        iv.copy_from_slice(&resp.device_random);

        let shared = self.secret.diffie_hellman(&PublicKey::from(device_pubkey));
        let mut key = shared.to_bytes();
        for (byte, mask) in key.iter_mut().zip(self.pop_hash.iter()) {
            *byte ^= mask;
        }

        debug!("security1 key exchanged");
        Ok(KeyExchanged {
            cipher: SessionCipher::new(&key, &iv),
            client_public: self.client_public,
            device_pubkey,
        })
    }
}

/// Handshake state after response0: keyed but not yet mutually verified.
#[derive(Debug)]
pub struct KeyExchanged {
    cipher: SessionCipher,
    client_public: [u8; 32],
    device_pubkey: [u8; 32],
}

impl KeyExchanged {
    /// Envelope bytes for command1. Call exactly once; encrypting the
    /// verify data consumes keystream bytes 0..32.
    pub fn command1(&mut self) -> Vec<u8> {
        let client_verify = self.cipher.encrypt(&self.device_pubkey);
        request::session_command1(&client_verify)
    }

    /// Consume the device's response1, verifying the peer.
    ///
    /// A verify-data mismatch is an authentication failure (wrong PoP or an
    /// impersonating peer) and never merely logged.
    pub fn process_response1(mut self, payload: &[u8]) -> Result<SessionCipher, SessionError> {
        let resp = response::decode_session_resp1(payload)?;

        if resp.status != 0 {
            return Err(SessionError::Command1Failed(resp.status));
        }

        let check = self.cipher.decrypt(&resp.device_verify);
        if check != self.client_public {
            return Err(SessionError::VerificationMismatch);
        }

        debug!("security1 peer verified");
        Ok(self.cipher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::fields;
    use crate::proto::wire::{RawMessage, put_bytes_field, put_message_field, put_varint_field};

    fn sec1_response(msg: u64, body_field: u32, body: &[u8]) -> Vec<u8> {
        let mut sec1 = Vec::new();
        put_varint_field(&mut sec1, fields::SEC1_MSG, msg);
        put_message_field(&mut sec1, body_field, body);
        let mut outer = Vec::new();
        put_varint_field(&mut outer, fields::SESSION_SEC_VER, 1);
        put_message_field(&mut outer, fields::SESSION_SEC1_PAYLOAD, &sec1);
        outer
    }

    fn resp0_payload(status: u64, pubkey: &[u8], random: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        put_varint_field(&mut body, fields::SESSION_RESP0_STATUS, status);
        put_bytes_field(&mut body, fields::SESSION_RESP0_PUBKEY, pubkey);
        put_bytes_field(&mut body, fields::SESSION_RESP0_RANDOM, random);
        sec1_response(fields::SEC1_MSG_RESP0, fields::SEC1_BODY_RESP0, &body)
    }

    fn resp1_payload(status: u64, verify: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        put_varint_field(&mut body, fields::SESSION_RESP1_STATUS, status);
        put_bytes_field(&mut body, fields::SESSION_RESP1_VERIFY, verify);
        sec1_response(fields::SEC1_MSG_RESP1, fields::SEC1_BODY_RESP1, &body)
    }

    /// In-test peer running the device half of the handshake with the real
    /// primitives.
    struct DevicePeer {
        cipher: SessionCipher,
        public: [u8; 32],
    }

    impl DevicePeer {
        fn respond0(pop: &str, cmd0: &[u8]) -> (Self, Vec<u8>) {
            let outer = RawMessage::decode(cmd0).unwrap();
            let sec1 =
                RawMessage::decode(outer.bytes_field(fields::SESSION_SEC1_PAYLOAD).unwrap())
                    .unwrap();
            assert_eq!(sec1.varint_field(fields::SEC1_MSG), Some(0));
            let body =
                RawMessage::decode(sec1.bytes_field(fields::SEC1_BODY_CMD0).unwrap()).unwrap();
            let mut client_public = [0u8; 32];
            client_public
                .copy_from_slice(body.bytes_field(fields::SESSION_CMD0_PUBKEY).unwrap());

            let secret = EphemeralSecret::random_from_rng(OsRng);
            let public = PublicKey::from(&secret).to_bytes();
            let shared = secret.diffie_hellman(&PublicKey::from(client_public));
            let pop_hash: [u8; 32] = Sha256::digest(pop.as_bytes()).into();
            let mut key = shared.to_bytes();
            for (byte, mask) in key.iter_mut().zip(pop_hash.iter()) {
                *byte ^= mask;
            }
            let random = [0x5au8; 16];

            let peer = Self {
                cipher: SessionCipher::new(&key, &random),
                public,
            };
            let payload = resp0_payload(0, &peer.public, &random);
            (peer, payload)
        }

        fn respond1(&mut self, cmd1: &[u8], client_public: &[u8; 32]) -> Vec<u8> {
            let outer = RawMessage::decode(cmd1).unwrap();
            let sec1 =
                RawMessage::decode(outer.bytes_field(fields::SESSION_SEC1_PAYLOAD).unwrap())
                    .unwrap();
            assert_eq!(sec1.varint_field(fields::SEC1_MSG), Some(2));
            let body =
                RawMessage::decode(sec1.bytes_field(fields::SEC1_BODY_CMD1).unwrap()).unwrap();
            let client_verify = body.bytes_field(fields::SESSION_CMD1_VERIFY).unwrap();

            // Keystream 0..32 consumed by the client's verify data
            let _ = self.cipher.decrypt(client_verify);
            // Keystream 32..64: our own verify data, sent regardless so a
            // mismatched client still gets an answer to reject
            let device_verify = self.cipher.encrypt(client_public);
            resp1_payload(0, &device_verify)
        }
    }

    #[test]
    fn test_full_handshake_reaches_verified() {
        let pop = "abcd1234";
        let handshake = Security1Handshake::new(pop);
        let client_public = handshake.client_public_key();

        let (mut peer, resp0) = DevicePeer::respond0(pop, &handshake.command0());
        let mut exchanged = handshake.process_response0(&resp0).unwrap();

        let cmd1 = exchanged.command1();
        let resp1 = peer.respond1(&cmd1, &client_public);
        let mut cipher = exchanged.process_response1(&resp1).unwrap();

        // Both ends now share one keystream at position 64
        let ciphertext = cipher.encrypt(b"config payload");
        assert_eq!(peer.cipher.decrypt(&ciphertext), b"config payload");
        let reply = peer.cipher.encrypt(b"ack");
        assert_eq!(cipher.decrypt(&reply), b"ack");
    }

    #[test]
    fn test_wrong_pop_fails_verification() {
        let handshake = Security1Handshake::new("correct-pop");
        let client_public = handshake.client_public_key();

        let (mut peer, resp0) = DevicePeer::respond0("wrong-pop", &handshake.command0());
        let mut exchanged = handshake.process_response0(&resp0).unwrap();

        let cmd1 = exchanged.command1();
        let resp1 = peer.respond1(&cmd1, &client_public);
        assert!(matches!(
            exchanged.process_response1(&resp1),
            Err(SessionError::VerificationMismatch)
        ));
    }

    #[test]
    fn test_response0_rejects_short_key_material() {
        let handshake = Security1Handshake::new("pop");
        let err = handshake
            .process_response0(&resp0_payload(0, &[1u8; 31], &[2u8; 16]))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidDevicePublicKey(31)));

        let handshake = Security1Handshake::new("pop");
        let err = handshake
            .process_response0(&resp0_payload(0, &[1u8; 32], &[2u8; 15]))
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidDeviceRandom(15)));
    }

    #[test]
    fn test_response0_nonzero_status_fails() {
        let handshake = Security1Handshake::new("pop");
        let err = handshake
            .process_response0(&resp0_payload(2, &[1u8; 32], &[2u8; 16]))
            .unwrap_err();
        assert!(matches!(err, SessionError::Command0Failed(2)));
    }

    #[test]
    fn test_response1_nonzero_status_fails() {
        let pop = "pop";
        let handshake = Security1Handshake::new(pop);
        let (_, resp0) = DevicePeer::respond0(pop, &handshake.command0());
        let mut exchanged = handshake.process_response0(&resp0).unwrap();
        let _ = exchanged.command1();

        let err = exchanged
            .process_response1(&resp1_payload(1, &[0u8; 32]))
            .unwrap_err();
        assert!(matches!(err, SessionError::Command1Failed(1)));
    }
}
