//! Cryptographic primitives for the mtgram protocol engine.
//!
//! Provides:
//! - AES-256-IGE encryption/decryption
//! - a SHA-1 hash macro
//! - Pollard-rho PQ factorization
//! - RSA encryption with hash-prefixed padding
//! - [`AuthKey`] — the 256-byte session key
//! - Message-level encryption / decryption
//! - DH nonce→key derivation

#![deny(unsafe_code)]

pub mod aes;
mod auth_key;
mod factorize;
pub mod rsa;
mod sha;

pub use auth_key::AuthKey;
pub use factorize::factorize;

// ─── Message encrypt / decrypt ───────────────────────────────────────────────

/// Errors from [`decrypt_data`].
#[derive(Clone, Debug, PartialEq)]
pub enum DecryptError {
    /// Ciphertext too short or not block-aligned.
    InvalidBuffer,
    /// The `auth_key_id` in the ciphertext does not match our key.
    AuthKeyMismatch,
    /// The `msg_key` in the ciphertext does not match our computed value.
    MessageKeyMismatch,
}

impl std::fmt::Display for DecryptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBuffer => write!(f, "invalid ciphertext buffer length"),
            Self::AuthKeyMismatch => write!(f, "auth_key_id mismatch"),
            Self::MessageKeyMismatch => write!(f, "msg_key mismatch"),
        }
    }
}
impl std::error::Error for DecryptError {}

/// Which end of the link produced a message.  Key derivation offsets into the
/// auth key differ per side, so a client decrypts server traffic with
/// [`Side::Server`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    fn x(&self) -> usize {
        match self {
            Side::Client => 0,
            Side::Server => 8,
        }
    }
}

fn calc_key(auth_key: &AuthKey, msg_key: &[u8; 16], side: Side) -> ([u8; 32], [u8; 32]) {
    let k = &auth_key.data;
    let x = side.x();

    let sha_a = sha1!(msg_key, &k[x..x + 32]);
    let sha_b = sha1!(&k[32 + x..48 + x], msg_key, &k[48 + x..64 + x]);
    let sha_c = sha1!(&k[64 + x..96 + x], msg_key);
    let sha_d = sha1!(msg_key, &k[96 + x..128 + x]);

    let mut aes_key = [0u8; 32];
    aes_key[..8].copy_from_slice(&sha_a[..8]);
    aes_key[8..20].copy_from_slice(&sha_b[8..20]);
    aes_key[20..].copy_from_slice(&sha_c[4..16]);

    let mut aes_iv = [0u8; 32];
    aes_iv[..12].copy_from_slice(&sha_a[8..20]);
    aes_iv[12..20].copy_from_slice(&sha_b[..8]);
    aes_iv[20..24].copy_from_slice(&sha_c[16..20]);
    aes_iv[24..].copy_from_slice(&sha_d[..8]);

    (aes_key, aes_iv)
}

fn padding_len(len: usize) -> usize {
    (16 - len % 16) % 16
}

/// Encrypt `plaintext` for the wire.
///
/// Returns `key_id || msg_key || ciphertext`.  `msg_key` binds the padded
/// plaintext to the auth key, so tampering is detected before the payload is
/// ever parsed.
pub fn encrypt_data(plaintext: &[u8], auth_key: &AuthKey, side: Side) -> Vec<u8> {
    let mut rnd = [0u8; 16];
    getrandom::getrandom(&mut rnd).expect("getrandom failed");
    do_encrypt_data(plaintext, auth_key, side, &rnd)
}

fn do_encrypt_data(plaintext: &[u8], auth_key: &AuthKey, side: Side, rnd: &[u8; 16]) -> Vec<u8> {
    let pad = padding_len(plaintext.len());
    let mut padded = Vec::with_capacity(plaintext.len() + pad);
    padded.extend_from_slice(plaintext);
    padded.extend_from_slice(&rnd[..pad]);

    let x = side.x();
    let msg_key_large = sha1!(&auth_key.data[88 + x..120 + x], &padded);
    let mut msg_key = [0u8; 16];
    msg_key.copy_from_slice(&msg_key_large[4..20]);

    let (key, iv) = calc_key(auth_key, &msg_key, side);
    aes::ige_encrypt(&mut padded, &key, &iv);

    let mut out = Vec::with_capacity(24 + padded.len());
    out.extend_from_slice(&auth_key.key_id);
    out.extend_from_slice(&msg_key);
    out.extend_from_slice(&padded);
    out
}

/// Decrypt a wire buffer produced by [`encrypt_data`] on the given `side`.
///
/// `buffer` must start with `key_id || msg_key || ciphertext`.  On success
/// returns a slice of `buffer` holding the padded plaintext; the caller reads
/// the embedded length field to trim the padding.
pub fn decrypt_data<'a>(
    buffer: &'a mut [u8],
    auth_key: &AuthKey,
    side: Side,
) -> Result<&'a mut [u8], DecryptError> {
    if buffer.len() < 24 || (buffer.len() - 24) % 16 != 0 {
        return Err(DecryptError::InvalidBuffer);
    }
    if auth_key.key_id != buffer[..8] {
        return Err(DecryptError::AuthKeyMismatch);
    }
    let mut msg_key = [0u8; 16];
    msg_key.copy_from_slice(&buffer[8..24]);

    let (key, iv) = calc_key(auth_key, &msg_key, side);
    aes::ige_decrypt(&mut buffer[24..], &key, &iv);

    let x = side.x();
    let our_key = sha1!(&auth_key.data[88 + x..120 + x], &buffer[24..]);
    if msg_key != our_key[4..20] {
        return Err(DecryptError::MessageKeyMismatch);
    }
    Ok(&mut buffer[24..])
}

/// Derive `(key, iv)` from the handshake nonces for decrypting
/// `server_DH_params_ok.encrypted_answer`.
pub fn generate_key_data_from_nonce(
    server_nonce: &[u8; 16],
    new_nonce: &[u8; 32],
) -> ([u8; 32], [u8; 32]) {
    let h1 = sha1!(new_nonce, server_nonce);
    let h2 = sha1!(server_nonce, new_nonce);
    let h3 = sha1!(new_nonce, new_nonce);

    let mut key = [0u8; 32];
    key[..20].copy_from_slice(&h1);
    key[20..].copy_from_slice(&h2[..12]);

    let mut iv = [0u8; 32];
    iv[..8].copy_from_slice(&h2[12..]);
    iv[8..28].copy_from_slice(&h3);
    iv[28..].copy_from_slice(&new_nonce[..4]);

    (key, iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> AuthKey {
        AuthKey::from_bytes(core::array::from_fn(|i| i as u8))
    }

    #[test]
    fn roundtrip_client_to_server() {
        let key = test_key();
        let plaintext = b"the quick brown fox jumps over the lazy dog.....".to_vec();
        assert_eq!(plaintext.len() % 16, 0);

        let mut wire = encrypt_data(&plaintext, &key, Side::Client);
        let decrypted = decrypt_data(&mut wire, &key, Side::Client).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn sides_derive_distinct_keys() {
        let key = test_key();
        let plaintext = vec![0x5au8; 32];

        let client = encrypt_data(&plaintext, &key, Side::Client);
        let server = encrypt_data(&plaintext, &key, Side::Server);
        assert_ne!(client[8..24], server[8..24]);
    }

    #[test]
    fn wrong_side_fails_msg_key_check() {
        let key = test_key();
        let mut wire = encrypt_data(&[0u8; 16], &key, Side::Client);
        assert_eq!(
            decrypt_data(&mut wire, &key, Side::Server),
            Err(DecryptError::MessageKeyMismatch)
        );
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = test_key();
        let mut wire = encrypt_data(&[3u8; 32], &key, Side::Client);
        let last = wire.len() - 1;
        wire[last] ^= 0x80;
        assert_eq!(
            decrypt_data(&mut wire, &key, Side::Client),
            Err(DecryptError::MessageKeyMismatch)
        );
    }

    #[test]
    fn foreign_key_id_is_rejected() {
        let key = test_key();
        let other = AuthKey::from_bytes([0xeeu8; 256]);
        let mut wire = encrypt_data(&[1u8; 16], &key, Side::Client);
        assert_eq!(
            decrypt_data(&mut wire, &other, Side::Client),
            Err(DecryptError::AuthKeyMismatch)
        );
    }

    #[test]
    fn short_buffer_is_rejected() {
        let key = test_key();
        assert_eq!(
            decrypt_data(&mut [0u8; 10], &key, Side::Server),
            Err(DecryptError::InvalidBuffer)
        );
    }

    #[test]
    fn unaligned_plaintext_is_padded() {
        let key = test_key();
        let mut wire = encrypt_data(&[9u8; 21], &key, Side::Client);
        let plain = decrypt_data(&mut wire, &key, Side::Client).unwrap();
        assert_eq!(plain.len(), 32);
        assert_eq!(&plain[..21], &[9u8; 21]);
    }

    #[test]
    fn nonce_key_derivation_is_deterministic() {
        let server_nonce = [1u8; 16];
        let new_nonce = [2u8; 32];
        let a = generate_key_data_from_nonce(&server_nonce, &new_nonce);
        let b = generate_key_data_from_nonce(&server_nonce, &new_nonce);
        assert_eq!(a, b);
        assert_ne!(a.0, a.1[..32]);
    }
}
