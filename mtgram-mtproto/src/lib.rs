//! MTProto session core.
//!
//! This crate handles:
//! * Message identifiers and sequence numbers
//! * Plaintext framing (for the initial key handshake)
//! * The sans-IO DH handshake itself ([`handshake`])
//! * Encrypted session state ([`encrypted`])
//!
//! It is intentionally transport-agnostic: bring your own TCP stream.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod encrypted;
pub mod handshake;
pub mod message;

pub use encrypted::{DecryptedMessage, EncryptedSession};
pub use message::{Message, MsgIdGen};
