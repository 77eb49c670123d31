//! Crypto module: secp256k1 keys, key difficulty, ECIES, recoverable signatures.
//!
//! - Keys: generation, difficulty gate, hex/SEC1 encoding
//! - ECIES: payload confidentiality + integrity for encrypted message variants
//! - Sign: recoverable ECDSA over the double-hashed short hash of a message
//!
//! [`MessageCrypto`] is the capability interface the wire layer calls into.

pub mod ecies;
pub mod keys;
pub mod sign;

pub use keys::{generate_difficult_key, key_difficulty, PrivateKey, PublicKey, MAX_DIFFICULTY};
pub use sign::{signing_digest, SIGNATURE_LEN};

use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("difficulty too high: {0}")]
    DifficultyTooHigh(u32),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("ciphertext truncated: got {got} bytes, need at least {need}")]
    Truncated { got: usize, need: usize },

    #[error("invalid mac")]
    InvalidMac,

    #[error("cipher initialisation failed")]
    Cipher,

    #[error("no remote public key established")]
    NoRemoteKey,
}

/// Operations the message codec needs: payload encryption and signing.
pub trait MessageCrypto: Send + Sync {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Sign a 32-byte signing digest.
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<bool, CryptoError>;
}

/// Local key plus the remote key once it is trusted.
///
/// Until a remote key is set, [`MessageCrypto::verify`] accepts every signature
/// and [`MessageCrypto::encrypt`] fails.
#[derive(Clone, Debug)]
pub struct SessionCrypto {
    local: PrivateKey,
    remote: Option<PublicKey>,
}

impl SessionCrypto {
    pub fn new(local: PrivateKey) -> Self {
        Self { local, remote: None }
    }

    pub fn with_remote(local: PrivateKey, remote: PublicKey) -> Self {
        Self { local, remote: Some(remote) }
    }

    pub fn set_remote(&mut self, remote: PublicKey) {
        self.remote = Some(remote);
    }
}

impl MessageCrypto for SessionCrypto {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let remote = self.remote.as_ref().ok_or(CryptoError::NoRemoteKey)?;
        ecies::encrypt(data, remote)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        ecies::decrypt(data, &self.local)
    }

    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, CryptoError> {
        sign::sign(digest, &self.local).map(|sig| sig.to_vec())
    }

    fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        match &self.remote {
            Some(remote) => sign::verify(digest, signature, remote),
            None => {
                trace!("no trusted remote key yet, signature not checked");
                Ok(true)
            }
        }
    }
}
