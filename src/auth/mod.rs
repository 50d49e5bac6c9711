// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Every webhook request passes through the same pipeline before a handler
//! sees it.
//!
//! ## Request Flow
//!
//! 1. [`AccessPolicy`] checks the TCP peer address (local-only, whitelist
//!    or open). Rejected callers never have their body read. The same check
//!    guards health and API docs through [`require_admitted`].
//! 2. The body is parsed as `{"signature": "...", "data": "..."}`.
//! 3. When signing is enabled, [`SignatureVerifier`] checks the base64
//!    Ed25519 signature over the raw `data` bytes against the key held by
//!    [`KeyStore`], then the `timestamp` inside `data` against a ±5 s window.
//! 4. The handler receives the `data` string through [`VerifiedData`].
//!
//! ## Key Rotation
//!
//! Administrators replace the key with the `/settoken` slash command. See
//! [`KeyRotator`]: the new blob is validated before it is written and the
//! store swaps atomically, so in-flight requests see either key but never
//! a mix.

pub mod access;
pub mod clock;
pub mod error;
pub mod extractor;
pub mod keystore;
pub mod middleware;
pub mod pipeline;
pub mod rotation;
pub mod scheme;
pub mod verifier;

pub use access::{peer_ip, AccessPolicy};
pub use clock::{Clock, SystemClock};
pub use error::AuthError;
pub use extractor::VerifiedData;
pub use keystore::{KeyError, KeyStore};
pub use middleware::require_admitted;
pub use pipeline::RequestPipeline;
pub use rotation::{KeyRotator, RotationError};
pub use scheme::{Ed25519, SignatureScheme, VerificationKey};
pub use verifier::{SignatureVerifier, VerificationVerdict, REPLAY_WINDOW_MS};
