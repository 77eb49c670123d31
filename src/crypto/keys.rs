use std::fmt;

use rand::rngs::OsRng;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use sha2::{Digest, Sha256};

use crate::crypto::CryptoError;

/// Highest meaningful difficulty: the bit length of a SHA-256 digest.
pub const MAX_DIFFICULTY: u32 = 256;
/// Uncompressed SEC1 point length (`0x04 || X || Y`).
pub const UNCOMPRESSED_LEN: usize = 65;

/// secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        Self { secret: SecretKey::random(&mut OsRng) }
    }

    /// Construct from 32 raw scalar bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| CryptoError::MalformedKey(format!("invalid secret key: {}", e)))?;
        Ok(Self { secret })
    }

    /// Export the scalar as bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes().into()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey { key: self.secret.public_key() }
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public_key().hex())
    }
}

/// secp256k1 public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    key: k256::PublicKey,
}

impl PublicKey {
    /// Parse `0x04 || X || Y`.
    pub fn from_uncompressed(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != UNCOMPRESSED_LEN || bytes[0] != 0x04 {
            return Err(CryptoError::MalformedKey(format!(
                "key not in uncompressed format ({} bytes, first byte {:?})",
                bytes.len(),
                bytes.first()
            )));
        }
        let key = k256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::MalformedKey("point not on curve".into()))?;
        Ok(Self { key })
    }

    /// Parse the 128-character `X || Y` hex form used in node records.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let coords = hex::decode(s)
            .map_err(|e| CryptoError::MalformedKey(format!("couldn't decode public key hex: {}", e)))?;
        if coords.len() != UNCOMPRESSED_LEN - 1 {
            return Err(CryptoError::MalformedKey(format!(
                "expected {} key bytes, got {}",
                UNCOMPRESSED_LEN - 1,
                coords.len()
            )));
        }
        let mut bytes = Vec::with_capacity(UNCOMPRESSED_LEN);
        bytes.push(0x04);
        bytes.extend_from_slice(&coords);
        Self::from_uncompressed(&bytes)
    }

    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let point = self.key.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// `X || Y`, each coordinate left-padded to 32 bytes.
    pub fn coordinates(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.to_uncompressed()[1..]);
        out
    }

    /// Always 128 lowercase hex characters.
    pub fn hex(&self) -> String {
        hex::encode(self.coordinates())
    }

    pub fn difficulty(&self) -> u32 {
        key_difficulty(self)
    }

    pub(crate) fn inner(&self) -> &k256::PublicKey {
        &self.key
    }
}

impl From<k256::PublicKey> for PublicKey {
    fn from(key: k256::PublicKey) -> Self {
        Self { key }
    }
}

/// Leading zero bits of `sha256(X || Y)`.
pub fn key_difficulty(key: &PublicKey) -> u32 {
    coordinates_difficulty(&key.coordinates())
}

/// Difficulty of raw `X || Y` coordinate bytes.
pub fn coordinates_difficulty(coordinates: &[u8]) -> u32 {
    let hash = Sha256::digest(coordinates);
    for (i, byte) in hash.iter().enumerate() {
        if *byte != 0 {
            return i as u32 * 8 + byte.leading_zeros();
        }
    }
    hash.len() as u32 * 8
}

/// Generate keys until one reaches `difficulty`. Difficulty 14 takes a second or two.
pub fn generate_difficult_key(difficulty: u32) -> Result<PrivateKey, CryptoError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(CryptoError::DifficultyTooHigh(difficulty));
    }
    loop {
        let key = PrivateKey::generate();
        if key_difficulty(&key.public_key()) >= difficulty {
            return Ok(key);
        }
    }
}
