// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature schemes for webhook envelopes.
//!
//! The key store and the verifier only see [`SignatureScheme`]. Ed25519 is
//! the scheme used in production; another algorithm plugs in by decoding its
//! own SubjectPublicKeyInfo and verifying its own signatures.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};

use super::keystore::KeyError;

/// `id-Ed25519` from RFC 8410.
pub const ED25519_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

const ED25519_KEY_LEN: usize = 32;
const ED25519_SIGNATURE_LEN: usize = 64;

/// Capability set needed to authenticate an envelope.
pub trait SignatureScheme: Send + Sync {
    /// Short algorithm name, used in logs and error messages.
    fn algorithm(&self) -> &'static str;

    /// Exact length of a decoded signature in bytes.
    fn signature_len(&self) -> usize;

    /// Decode a DER SubjectPublicKeyInfo into a verification key.
    fn decode_key(&self, spki_der: &[u8]) -> Result<VerificationKey, KeyError>;

    /// Check `signature` over `message`. Never panics on malformed input.
    fn verify(&self, key: &VerificationKey, message: &[u8], signature: &[u8]) -> bool;
}

/// A decoded public key, tagged with the algorithm that produced it.
///
/// Keys are immutable once built; rotation replaces the whole value.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationKey {
    algorithm: &'static str,
    bytes: Vec<u8>,
}

impl VerificationKey {
    pub fn new(algorithm: &'static str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            bytes: bytes.into(),
        }
    }

    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex prefix of the raw key, safe to log.
    pub fn fingerprint(&self) -> String {
        let shown = self.bytes.len().min(8);
        hex::encode(&self.bytes[..shown])
    }
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("algorithm", &self.algorithm)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Ed25519 (RFC 8032) over the raw payload bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519;

impl SignatureScheme for Ed25519 {
    fn algorithm(&self) -> &'static str {
        "ed25519"
    }

    fn signature_len(&self) -> usize {
        ED25519_SIGNATURE_LEN
    }

    fn decode_key(&self, spki_der: &[u8]) -> Result<VerificationKey, KeyError> {
        let spki = SubjectPublicKeyInfoRef::try_from(spki_der)
            .map_err(|e| KeyError::Encoding(format!("invalid DER public key: {e}")))?;

        if spki.algorithm.oid != ED25519_OID {
            return Err(KeyError::AlgorithmMismatch {
                expected: self.algorithm(),
                found: spki.algorithm.oid.to_string(),
            });
        }

        // RFC 8410: the parameters field MUST be absent for Ed25519.
        if spki.algorithm.parameters.is_some() {
            return Err(KeyError::Encoding(
                "ed25519 algorithm identifier must not carry parameters".to_string(),
            ));
        }

        let raw = spki.subject_public_key.as_bytes().ok_or_else(|| {
            KeyError::Encoding("public key bit string is not octet aligned".to_string())
        })?;

        let raw: [u8; ED25519_KEY_LEN] = raw.try_into().map_err(|_| {
            KeyError::Encoding(format!(
                "ed25519 public key must be {ED25519_KEY_LEN} bytes, got {}",
                raw.len()
            ))
        })?;

        VerifyingKey::from_bytes(&raw)
            .map_err(|e| KeyError::Encoding(format!("invalid ed25519 public key: {e}")))?;

        Ok(VerificationKey::new(self.algorithm(), raw))
    }

    fn verify(&self, key: &VerificationKey, message: &[u8], signature: &[u8]) -> bool {
        if key.algorithm() != self.algorithm() {
            return false;
        }

        let Ok(raw) = <[u8; ED25519_KEY_LEN]>::try_from(key.as_bytes()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&raw) else {
            return false;
        };
        let Ok(signature) = <[u8; ED25519_SIGNATURE_LEN]>::try_from(signature) else {
            return false;
        };

        verifying_key
            .verify(message, &Signature::from_bytes(&signature))
            .is_ok()
    }
}
