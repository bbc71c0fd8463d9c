//! RSA encryption for the opening handshake step.
//!
//! The payload is framed as `SHA1(data) || data || random`, zero-extended by
//! random bytes to 255 bytes, and raised to `e` mod `n`.  The server matches
//! the key by its 64-bit fingerprint, taken from the tail of the SHA-1 of the
//! TL-encoded `(n, e)` pair.

use num_bigint::BigUint;

use crate::sha1;

/// An RSA public key (n, e).
pub struct Key {
    n: BigUint,
    e: BigUint,
}

impl Key {
    /// Parse decimal `n` and `e` strings.
    pub fn new(n: &str, e: &str) -> Option<Self> {
        Some(Self {
            n: BigUint::parse_bytes(n.as_bytes(), 10)?,
            e: BigUint::parse_bytes(e.as_bytes(), 10)?,
        })
    }

    /// The key's 64-bit fingerprint as advertised in `resPQ`.
    pub fn fingerprint(&self) -> i64 {
        let n = tl_bytes(&self.n.to_bytes_be());
        let e = tl_bytes(&self.e.to_bytes_be());
        let sha = sha1!(&n, &e);
        i64::from_le_bytes(sha[12..20].try_into().unwrap())
    }
}

// TL byte-string framing: compact length prefix, zero-padded to 4 bytes.
fn tl_bytes(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut out = if len <= 253 {
        vec![len as u8]
    } else {
        vec![
            0xfe,
            (len & 0xff) as u8,
            ((len >> 8) & 0xff) as u8,
            ((len >> 16) & 0xff) as u8,
        ]
    };
    out.extend_from_slice(data);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

/// RSA-encrypt `data` with the hash-prefixed legacy padding.
///
/// `data` must be at most 235 bytes; `random_bytes` fills the frame out to
/// 255 bytes.
pub fn encrypt_hashed(data: &[u8], key: &Key, random_bytes: &[u8; 235]) -> Vec<u8> {
    assert!(data.len() <= 235, "data too large for hashed RSA frame");

    let mut padded = Vec::with_capacity(255);
    padded.extend_from_slice(&sha1!(data));
    padded.extend_from_slice(data);
    padded.extend_from_slice(&random_bytes[..255 - padded.len()]);

    let payload = BigUint::from_bytes_be(&padded);
    let encrypted = payload.modpow(&key.e, &key.n);
    let mut block = encrypted.to_bytes_be();
    while block.len() < 256 {
        block.insert(0, 0);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    // Small key for layout checks only: n = 3233 (61 * 53), e = 17.
    fn tiny_key() -> Key {
        Key::new("3233", "17").unwrap()
    }

    #[test]
    fn fingerprint_is_stable() {
        let k = tiny_key();
        assert_eq!(k.fingerprint(), k.fingerprint());
    }

    #[test]
    fn output_is_always_256_bytes() {
        let k = tiny_key();
        let block = encrypt_hashed(b"hello", &k, &[7u8; 235]);
        assert_eq!(block.len(), 256);
    }
}
