/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The definitions and re-exports in this module provide two categories of cryptographic primitives:
//! 1. **Cryptographic Hashes**: provided by the [`sha2`] crate. Used to compute configuration digests.
//! 2. **Digital Signatures**: provided by the [`ed25519_dalek`] crate. Used by channel admins to sign
//!    configuration updates.

use super::data_types::{CryptoHash, SignatureBytes, VerifyingKeyBytes};

// re-exports below.
pub use sha2::Digest;
pub use sha2::Sha256 as CryptoHasher;

pub use ed25519_dalek::{Signature, SignatureError, Signer, SigningKey, Verifier, VerifyingKey};

/// Compute the SHA256 hash of `bytes`.
pub fn hash(bytes: &[u8]) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    hasher.update(bytes);
    CryptoHash::new(hasher.finalize().into())
}

/// Sign an arbitrary `message` with `signing_key`.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> SignatureBytes {
    SignatureBytes::new(signing_key.sign(message).to_bytes())
}

/// Check that `signature` over `message` was produced by the key whose bytes are `signer`.
///
/// Returns `false` both when `signer` is not a valid Ed25519 point and when the signature does not
/// verify.
pub fn verify(signer: &VerifyingKeyBytes, message: &[u8], signature: &SignatureBytes) -> bool {
    match VerifyingKey::from_bytes(signer) {
        Ok(verifying_key) => verifying_key
            .verify(message, &Signature::from_bytes(&signature.bytes()))
            .is_ok(),
        Err(_) => false,
    }
}
