// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Envelope signature verification.
//!
//! ## Order of checks
//!
//! 1. a key must be loaded (fail closed)
//! 2. the signature must decode to exactly one scheme-sized signature
//! 3. the signature must verify over the raw `data` bytes
//! 4. only then is `data` parsed, and its `timestamp` checked against a
//!    symmetric ±5 s window
//!
//! Nothing inside `data` is interpreted before step 3 succeeds.

use std::sync::Arc;

use base64ct::{Base64, Encoding};
use serde_json::{Map, Value};

use super::scheme::{SignatureScheme, VerificationKey};

/// Maximum distance between the payload timestamp and now.
pub const REPLAY_WINDOW_MS: i64 = 5_000;

/// Outcome of a single verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationVerdict {
    Valid,
    InvalidSignature,
    MalformedPayload,
    MissingTimestamp,
    TimestampOutOfWindow,
    KeyUnavailable,
}

impl VerificationVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationVerdict::Valid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationVerdict::Valid => "valid",
            VerificationVerdict::InvalidSignature => "invalid_signature",
            VerificationVerdict::MalformedPayload => "malformed_payload",
            VerificationVerdict::MissingTimestamp => "missing_timestamp",
            VerificationVerdict::TimestampOutOfWindow => "timestamp_out_of_window",
            VerificationVerdict::KeyUnavailable => "key_unavailable",
        }
    }
}

impl std::fmt::Display for VerificationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed `data` object: a mandatory numeric timestamp plus whatever
/// operation fields the handler expects.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedPayload {
    pub timestamp_ms: f64,
    pub fields: Map<String, Value>,
}

impl SignedPayload {
    /// Parse raw `data` bytes. A `timestamp` of any non-number type,
    /// `null` included, is a malformed payload rather than a missing one.
    pub fn parse(raw: &[u8]) -> Result<Self, VerificationVerdict> {
        let mut fields: Map<String, Value> =
            serde_json::from_slice(raw).map_err(|_| VerificationVerdict::MalformedPayload)?;

        let timestamp_ms = match fields.remove("timestamp") {
            None => return Err(VerificationVerdict::MissingTimestamp),
            Some(Value::Number(n)) => n.as_f64().ok_or(VerificationVerdict::MalformedPayload)?,
            Some(_) => return Err(VerificationVerdict::MalformedPayload),
        };

        Ok(Self {
            timestamp_ms,
            fields,
        })
    }
}

/// Checks envelope signatures and the replay window.
#[derive(Clone)]
pub struct SignatureVerifier {
    scheme: Arc<dyn SignatureScheme>,
}

impl SignatureVerifier {
    pub fn new(scheme: Arc<dyn SignatureScheme>) -> Self {
        Self { scheme }
    }

    pub fn verify(
        &self,
        raw_payload: &[u8],
        signature_b64: &str,
        key: Option<&VerificationKey>,
        now_ms: i64,
    ) -> VerificationVerdict {
        let Some(key) = key else {
            return VerificationVerdict::KeyUnavailable;
        };

        let signature = match Base64::decode_vec(signature_b64) {
            Ok(bytes) if bytes.len() == self.scheme.signature_len() => bytes,
            _ => return VerificationVerdict::InvalidSignature,
        };

        if !self.scheme.verify(key, raw_payload, &signature) {
            return VerificationVerdict::InvalidSignature;
        }

        let payload = match SignedPayload::parse(raw_payload) {
            Ok(payload) => payload,
            Err(verdict) => return verdict,
        };

        if (now_ms as f64 - payload.timestamp_ms).abs() > REPLAY_WINDOW_MS as f64 {
            return VerificationVerdict::TimestampOutOfWindow;
        }

        VerificationVerdict::Valid
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("algorithm", &self.scheme.algorithm())
            .field("window_ms", &REPLAY_WINDOW_MS)
            .finish()
    }
}
