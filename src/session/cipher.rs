//! Order-dependent session stream cipher

use std::fmt;

use aes::Aes256;
use ctr::{
    Ctr128BE,
    cipher::{KeyIvInit, StreamCipher},
};

type Aes256Ctr = Ctr128BE<Aes256>;

/// The verified Security1 session cipher.
///
/// Both directions share one AES-256-CTR keystream: `encrypt` and `decrypt`
/// advance the same counter state. Calls must happen strictly in wire order;
/// skipping, replaying or reordering a call desynchronizes the channel for
/// every call after it.
pub struct SessionCipher {
    cipher: Aes256Ctr,
}

impl SessionCipher {
    pub fn new(key: &[u8; 32], iv: &[u8; 16]) -> Self {
        Self {
            cipher: Aes256Ctr::new(key.into(), iv.into()),
        }
    }

    /// Encrypt `plaintext`, consuming `plaintext.len()` keystream bytes.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        let mut data = plaintext.to_vec();
        self.cipher.apply_keystream(&mut data);
        data
    }

    /// Decrypt `ciphertext`, consuming `ciphertext.len()` keystream bytes.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Vec<u8> {
        let mut data = ciphertext.to_vec();
        self.cipher.apply_keystream(&mut data);
        data
    }
}

impl fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCipher(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];
    const IV: [u8; 16] = [0x07; 16];

    #[test]
    fn test_lockstep_peers_agree() {
        let mut client = SessionCipher::new(&KEY, &IV);
        let mut device = SessionCipher::new(&KEY, &IV);

        let first = client.encrypt(b"first message");
        assert_eq!(device.decrypt(&first), b"first message");

        let reply = device.encrypt(b"reply");
        assert_eq!(client.decrypt(&reply), b"reply");
    }

    #[test]
    fn test_ciphertext_differs_from_plaintext() {
        let mut cipher = SessionCipher::new(&KEY, &IV);
        let ciphertext = cipher.encrypt(b"credentials");
        assert_ne!(ciphertext, b"credentials");
    }

    #[test]
    fn test_out_of_order_decrypt_corrupts() {
        let mut sender = SessionCipher::new(&KEY, &IV);
        let first = sender.encrypt(b"first");
        let second = sender.encrypt(b"second");

        // A receiver that skips the first ciphertext is desynchronized
        let mut receiver = SessionCipher::new(&KEY, &IV);
        assert_ne!(receiver.decrypt(&second), b"second");

        // An in-order receiver recovers both
        let mut in_order = SessionCipher::new(&KEY, &IV);
        assert_eq!(in_order.decrypt(&first), b"first");
        assert_eq!(in_order.decrypt(&second), b"second");
    }
}
