//! AES-256 in IGE (Infinite Garble Extension) mode.
//!
//! IGE chains both the previous plaintext and the previous ciphertext block,
//! so a single corrupted block garbles everything after it.  The 32-byte IV
//! is split into the initial ciphertext half followed by the initial
//! plaintext half.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;

/// Encrypt `data` in place.  `data.len()` must be a multiple of 16.
pub fn ige_encrypt(data: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    assert_eq!(data.len() % 16, 0, "IGE requires block-aligned input");
    let cipher = Aes256::new(GenericArray::from_slice(key));

    let mut prev_cipher: [u8; 16] = iv[..16].try_into().unwrap();
    let mut prev_plain: [u8; 16] = iv[16..].try_into().unwrap();

    for chunk in data.chunks_exact_mut(16) {
        let plain: [u8; 16] = chunk.try_into().unwrap();

        let mut block = [0u8; 16];
        for i in 0..16 {
            block[i] = plain[i] ^ prev_cipher[i];
        }
        cipher.encrypt_block(GenericArray::from_mut_slice(&mut block));
        for i in 0..16 {
            block[i] ^= prev_plain[i];
        }

        chunk.copy_from_slice(&block);
        prev_cipher = block;
        prev_plain = plain;
    }
}

/// Decrypt `data` in place.  `data.len()` must be a multiple of 16.
pub fn ige_decrypt(data: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    assert_eq!(data.len() % 16, 0, "IGE requires block-aligned input");
    let cipher = Aes256::new(GenericArray::from_slice(key));

    let mut prev_cipher: [u8; 16] = iv[..16].try_into().unwrap();
    let mut prev_plain: [u8; 16] = iv[16..].try_into().unwrap();

    for chunk in data.chunks_exact_mut(16) {
        let encrypted: [u8; 16] = chunk.try_into().unwrap();

        let mut block = [0u8; 16];
        for i in 0..16 {
            block[i] = encrypted[i] ^ prev_plain[i];
        }
        cipher.decrypt_block(GenericArray::from_mut_slice(&mut block));
        for i in 0..16 {
            block[i] ^= prev_cipher[i];
        }

        chunk.copy_from_slice(&block);
        prev_cipher = encrypted;
        prev_plain = block;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ige_roundtrip() {
        let key = [0x11u8; 32];
        let iv: [u8; 32] = core::array::from_fn(|i| i as u8);
        let original: Vec<u8> = (0u8..64).collect();

        let mut data = original.clone();
        ige_encrypt(&mut data, &key, &iv);
        assert_ne!(data, original);
        ige_decrypt(&mut data, &key, &iv);
        assert_eq!(data, original);
    }

    #[test]
    fn ige_block_corruption_garbles_tail() {
        let key = [0x22u8; 32];
        let iv = [0u8; 32];
        let original = vec![7u8; 48];

        let mut data = original.clone();
        ige_encrypt(&mut data, &key, &iv);
        data[0] ^= 1;
        ige_decrypt(&mut data, &key, &iv);
        assert_ne!(&data[16..], &original[16..]);
    }
}
