// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification key storage.
//!
//! The key lives on disk as base64-wrapped DER SubjectPublicKeyInfo, one
//! blob per file, surrounding whitespace ignored. In memory it is an
//! `Arc<VerificationKey>` behind a short-lived lock: readers clone the
//! `Arc` and verify without holding anything, writers only swap the pointer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64ct::{Base64, Encoding};
use parking_lot::RwLock;
use tracing::{info, warn};

use super::scheme::{SignatureScheme, VerificationKey};

/// Errors raised while loading a verification key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("failed to read key file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid key encoding: {0}")]
    Encoding(String),

    #[error("unexpected key algorithm: expected {expected}, found OID {found}")]
    AlgorithmMismatch {
        expected: &'static str,
        found: String,
    },
}

/// Decode a persisted key blob (base64 of DER SPKI).
pub fn decode_key_blob(
    blob: &[u8],
    scheme: &dyn SignatureScheme,
) -> Result<VerificationKey, KeyError> {
    let text = std::str::from_utf8(blob.trim_ascii())
        .map_err(|_| KeyError::Encoding("key blob is not valid UTF-8".to_string()))?;

    let der = Base64::decode_vec(text)
        .map_err(|e| KeyError::Encoding(format!("invalid base64 public key: {e}")))?;

    scheme.decode_key(&der)
}

/// Read and decode the key file at `path`.
pub fn load(path: &Path, scheme: &dyn SignatureScheme) -> Result<VerificationKey, KeyError> {
    let blob = fs::read(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_key_blob(&blob, scheme)
}

/// Owner of the active verification key.
pub struct KeyStore {
    path: PathBuf,
    scheme: Arc<dyn SignatureScheme>,
    current: RwLock<Option<Arc<VerificationKey>>>,
}

impl KeyStore {
    /// Create an empty store bound to `path`. Nothing is read from disk.
    pub fn new(path: impl Into<PathBuf>, scheme: Arc<dyn SignatureScheme>) -> Self {
        Self {
            path: path.into(),
            scheme,
            current: RwLock::new(None),
        }
    }

    /// Create a store and try to load the key file.
    ///
    /// A missing or invalid file leaves the store empty; verification then
    /// fails closed until a key is installed with `/settoken`.
    pub fn open(path: impl Into<PathBuf>, scheme: Arc<dyn SignatureScheme>) -> Self {
        let store = Self::new(path, scheme);
        match store.reload() {
            Ok(()) => {}
            Err(KeyError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                warn!(
                    path = %store.path.display(),
                    "Public key not found. Use /settoken to set the public key."
                );
            }
            Err(e) => {
                warn!(
                    path = %store.path.display(),
                    error = %e,
                    "Public key could not be loaded. Use /settoken to set the public key."
                );
            }
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scheme(&self) -> &dyn SignatureScheme {
        self.scheme.as_ref()
    }

    pub(crate) fn scheme_handle(&self) -> Arc<dyn SignatureScheme> {
        Arc::clone(&self.scheme)
    }

    /// Snapshot of the active key.
    pub fn current(&self) -> Option<Arc<VerificationKey>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Re-read the key file and swap it in. On any error the previous key
    /// stays active.
    pub fn reload(&self) -> Result<(), KeyError> {
        let key = load(&self.path, self.scheme.as_ref())?;
        info!(
            path = %self.path.display(),
            algorithm = key.algorithm(),
            fingerprint = %key.fingerprint(),
            "Verification key loaded"
        );
        *self.current.write() = Some(Arc::new(key));
        Ok(())
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("path", &self.path)
            .field("algorithm", &self.scheme.algorithm())
            .field("current", &self.current())
            .finish()
    }
}
