use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha1::Sha1;
use sha3::{Digest, Sha3_256};

use crate::crypto::{CryptoError, PrivateKey, PublicKey};

/// `r || s || v`
pub const SIGNATURE_LEN: usize = 65;

/// Short hash of a message: SHA-1 over the encoded `[type, timestamp]` pair
/// followed by the encoded payload slots.
pub fn short_hash(header: &[u8], payload: &[u8]) -> [u8; 20] {
    let mut h = Sha1::new();
    h.update(header);
    h.update(payload);
    h.finalize().into()
}

/// The 32-byte value actually signed: SHA3-256 of the short hash.
pub fn signing_digest(header: &[u8], payload: &[u8]) -> [u8; 32] {
    Sha3_256::digest(short_hash(header, payload)).into()
}

/// Recoverable ECDSA over a 32-byte digest.
pub fn sign(digest: &[u8], key: &PrivateKey) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    let signing_key = SigningKey::from(key.secret());
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Recover the signer of `digest` and compare it with `key`.
pub fn verify(digest: &[u8], signature: &[u8], key: &PublicKey) -> Result<bool, CryptoError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(CryptoError::MalformedSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            signature.len()
        )));
    }
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    // some signers use the 27/28 convention
    let v = match signature[64] {
        v @ 27..=30 => v - 27,
        v => v,
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| CryptoError::MalformedSignature(format!("invalid recovery id {}", v)))?;
    let recovered = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| CryptoError::MalformedSignature(format!("unable to recover public key: {}", e)))?;
    Ok(recovered == VerifyingKey::from(key.inner()))
}
