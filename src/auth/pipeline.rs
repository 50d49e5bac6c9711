// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Webhook request pipeline.
//!
//! ```text
//! peer ip ─▶ AccessPolicy ─▶ envelope JSON ─▶ SignatureVerifier ─▶ handler
//!             │ 403            │ 400             │ 403
//! ```
//!
//! Every stage is terminal on failure. The pipeline never looks at
//! operation fields; handlers decode `data` themselves.

use std::sync::Arc;

use tracing::{debug, warn};

use super::access::AccessPolicy;
use super::clock::Clock;
use super::error::AuthError;
use super::keystore::KeyStore;
use super::verifier::{SignatureVerifier, VerificationVerdict};
use crate::models::SignedEnvelope;

/// The signed `data` string of an accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedData(pub String);

/// Admission and authentication for webhook requests.
pub struct RequestPipeline {
    policy: AccessPolicy,
    signing_enabled: bool,
    keys: Arc<KeyStore>,
    verifier: SignatureVerifier,
    clock: Arc<dyn Clock>,
}

impl RequestPipeline {
    pub fn new(
        policy: AccessPolicy,
        signing_enabled: bool,
        keys: Arc<KeyStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let verifier = SignatureVerifier::new(keys.scheme_handle());
        Self {
            policy,
            signing_enabled,
            keys,
            verifier,
            clock,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn signing_enabled(&self) -> bool {
        self.signing_enabled
    }

    pub fn keys(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    /// Gate stage. Runs before the body is read.
    pub fn admit(&self, remote_ip: &str) -> Result<(), AuthError> {
        if self.policy.check(remote_ip) {
            Ok(())
        } else {
            warn!(
                remote_ip,
                policy = self.policy.mode(),
                "Unauthorized request from IP"
            );
            Err(AuthError::AccessDenied)
        }
    }

    /// Envelope and signature stages.
    pub fn authenticate(&self, remote_ip: &str, body: &[u8]) -> Result<VerifiedData, AuthError> {
        let envelope: SignedEnvelope = serde_json::from_slice(body).map_err(|e| {
            warn!(remote_ip, error = %e, "Rejecting malformed envelope");
            AuthError::EnvelopeMalformed
        })?;

        if !self.signing_enabled {
            debug!(remote_ip, "Signing disabled, skipping signature verification");
            return Ok(VerifiedData(envelope.data));
        }

        let key = self.keys.current();
        let verdict = self.verifier.verify(
            envelope.data.as_bytes(),
            envelope.signature.as_deref().unwrap_or_default(),
            key.as_deref(),
            self.clock.now_ms(),
        );

        match verdict {
            VerificationVerdict::Valid => {
                debug!(remote_ip, "Envelope signature verified");
                Ok(VerifiedData(envelope.data))
            }
            VerificationVerdict::KeyUnavailable => {
                warn!(
                    remote_ip,
                    "Signing is enabled but no public key is loaded; rejecting request"
                );
                Err(AuthError::KeyUnavailable)
            }
            verdict => {
                warn!(remote_ip, %verdict, "Envelope verification failed");
                Err(AuthError::VerificationFailed(verdict))
            }
        }
    }

    /// Full pipeline over an already-buffered body.
    pub fn process(&self, remote_ip: &str, body: &[u8]) -> Result<VerifiedData, AuthError> {
        self.admit(remote_ip)?;
        self.authenticate(remote_ip, body)
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("policy", &self.policy)
            .field("signing_enabled", &self.signing_enabled)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}
