//! Security1 session establishment and the resulting stream cipher

pub mod cipher;
pub mod handshake;

pub use cipher::SessionCipher;
pub use handshake::{KeyExchanged, Security1Handshake};
