//! ECIES over secp256k1, wire-compatible with the devp2p/pyelliptic layout:
//!
//! `0x04 || X || Y || iv(16) || AES-128-CTR(ciphertext) || HMAC-SHA256(32)`
//!
//! The leading point is a fresh ephemeral public key. The MAC covers `iv || ciphertext`
//! and is checked before any plaintext is produced.

use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use k256::ecdh::EphemeralSecret;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::crypto::keys::UNCOMPRESSED_LEN;
use crate::crypto::{CryptoError, PrivateKey, PublicKey};

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

pub const IV_LEN: usize = 16;
pub const MAC_LEN: usize = 32;
/// Smallest possible ciphertext (empty plaintext).
pub const OVERHEAD: usize = UNCOMPRESSED_LEN + IV_LEN + MAC_LEN;

/// Encrypt `data` to `recipient`.
pub fn encrypt(data: &[u8], recipient: &PublicKey) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let shared = ephemeral.diffie_hellman(recipient.inner());
    let (key_e, key_m) = derive_keys(shared.raw_secret_bytes());

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let mut ciphertext = data.to_vec();
    let mut cipher = Aes128Ctr::new_from_slices(&key_e, &iv).map_err(|_| CryptoError::Cipher)?;
    cipher.apply_keystream(&mut ciphertext);

    let mut out = Vec::with_capacity(OVERHEAD + data.len());
    out.extend_from_slice(&PublicKey::from(ephemeral.public_key()).to_uncompressed());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);

    let mut mac = HmacSha256::new_from_slice(&key_m).map_err(|_| CryptoError::Cipher)?;
    mac.update(&out[UNCOMPRESSED_LEN..]);
    out.extend_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Decrypt a message addressed to `key`; fails with [`CryptoError::InvalidMac`] on tampering.
pub fn decrypt(raw: &[u8], key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
    if raw.len() < OVERHEAD {
        return Err(CryptoError::Truncated { got: raw.len(), need: OVERHEAD });
    }
    let ephemeral = PublicKey::from_uncompressed(&raw[..UNCOMPRESSED_LEN])?;
    let (body, tag) = raw.split_at(raw.len() - MAC_LEN);

    let shared = k256::ecdh::diffie_hellman(
        key.secret().to_nonzero_scalar(),
        ephemeral.inner().as_affine(),
    );
    let (key_e, key_m) = derive_keys(shared.raw_secret_bytes());

    let mut mac = HmacSha256::new_from_slice(&key_m).map_err(|_| CryptoError::Cipher)?;
    mac.update(&body[UNCOMPRESSED_LEN..]);
    mac.verify_slice(tag).map_err(|_| CryptoError::InvalidMac)?;

    let (iv, ciphertext) = body[UNCOMPRESSED_LEN..].split_at(IV_LEN);
    let mut plaintext = ciphertext.to_vec();
    let mut cipher = Aes128Ctr::new_from_slices(&key_e, iv).map_err(|_| CryptoError::Cipher)?;
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

/// Concat KDF (one SHA-256 block, counter 1) split into the cipher key
/// and the hashed MAC key.
fn derive_keys(shared_x: &[u8]) -> ([u8; 16], [u8; 32]) {
    let mut h = Sha256::new();
    h.update(1u32.to_be_bytes());
    h.update(shared_x);
    let derived = h.finalize();

    let mut key_e = [0u8; 16];
    key_e.copy_from_slice(&derived[..16]);
    let key_m: [u8; 32] = Sha256::digest(&derived[16..]).into();
    (key_e, key_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let recipient = PrivateKey::generate();
        let data = b"asdf";
        let encrypted = encrypt(data, &recipient.public_key()).unwrap();
        assert_eq!(encrypted.len(), OVERHEAD + data.len());
        assert_eq!(encrypted[0], 0x04);
        let decrypted = decrypt(&encrypted, &recipient).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_empty_plaintext() {
        let recipient = PrivateKey::generate();
        let encrypted = encrypt(&[], &recipient.public_key()).unwrap();
        assert!(decrypt(&encrypted, &recipient).unwrap().is_empty());
    }

    #[test]
    fn test_tampered_mac() {
        let recipient = PrivateKey::generate();
        let mut encrypted = encrypt(b"payload", &recipient.public_key()).unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert!(matches!(decrypt(&encrypted, &recipient), Err(CryptoError::InvalidMac)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let recipient = PrivateKey::generate();
        let mut encrypted = encrypt(b"payload", &recipient.public_key()).unwrap();
        encrypted[OVERHEAD - MAC_LEN] ^= 0x80;
        assert!(matches!(decrypt(&encrypted, &recipient), Err(CryptoError::InvalidMac)));
    }

    #[test]
    fn test_wrong_recipient() {
        let recipient = PrivateKey::generate();
        let other = PrivateKey::generate();
        let encrypted = encrypt(b"payload", &recipient.public_key()).unwrap();
        assert!(matches!(decrypt(&encrypted, &other), Err(CryptoError::InvalidMac)));
    }

    #[test]
    fn test_truncated() {
        let recipient = PrivateKey::generate();
        assert!(matches!(
            decrypt(&[0x04; 10], &recipient),
            Err(CryptoError::Truncated { got: 10, need: OVERHEAD })
        ));
    }
}
