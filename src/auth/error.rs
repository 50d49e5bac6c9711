// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Webhook authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::verifier::VerificationVerdict;

/// Terminal rejection of a webhook request.
///
/// The variants are distinct in logs. On the wire every gate and signature
/// failure collapses to the same `403 {"error":"Forbidden"}` so a caller
/// cannot tell a bad address from a bad signature or a stale timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Caller address not admitted by the access policy
    AccessDenied,
    /// Outer envelope is not `{"signature": string, "data": string}`
    EnvelopeMalformed,
    /// Signature or timestamp check failed
    VerificationFailed(VerificationVerdict),
    /// Signing is enabled but no key is loaded
    KeyUnavailable,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl AuthError {
    /// Label used in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::AccessDenied => "access_denied",
            AuthError::EnvelopeMalformed => "envelope_malformed",
            AuthError::VerificationFailed(_) => "verification_failed",
            AuthError::KeyUnavailable => "key_unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::EnvelopeMalformed => StatusCode::BAD_REQUEST,
            AuthError::AccessDenied
            | AuthError::VerificationFailed(_)
            | AuthError::KeyUnavailable => StatusCode::FORBIDDEN,
        }
    }

    /// Message returned to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::EnvelopeMalformed => "Invalid request body",
            AuthError::AccessDenied
            | AuthError::VerificationFailed(_)
            | AuthError::KeyUnavailable => "Forbidden",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::AccessDenied => write!(f, "Caller address is not allowed"),
            AuthError::EnvelopeMalformed => write!(f, "Request envelope is malformed"),
            AuthError::VerificationFailed(verdict) => {
                write!(f, "Envelope verification failed: {verdict}")
            }
            AuthError::KeyUnavailable => write!(f, "No verification key is loaded"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            error: self.public_message(),
        });
        (self.status_code(), body).into_response()
    }
}
