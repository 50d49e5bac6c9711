// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrator key rotation.
//!
//! A new blob is fully decoded before anything touches disk. The file is
//! replaced through a temp sibling and a rename, then the store reloads
//! from it, so the on-disk key and the in-memory key never disagree about
//! a blob that failed validation.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::keystore::{decode_key_blob, KeyError, KeyStore};

/// Why a rotation was refused.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("requester is not an administrator")]
    Unauthorized,

    #[error("no key material supplied")]
    MissingInput,

    #[error("supplied key is invalid: {0}")]
    InvalidKey(#[source] KeyError),

    #[error("failed to persist key: {0}")]
    Persist(#[source] io::Error),

    #[error("key persisted but reload failed: {0}")]
    Reload(#[source] KeyError),
}

impl RotationError {
    /// Ephemeral reply shown to the command invoker.
    pub fn reply(&self) -> String {
        match self {
            RotationError::Unauthorized => {
                "You do not have permission to use this command.".to_string()
            }
            RotationError::MissingInput => "Token is required.".to_string(),
            RotationError::InvalidKey(e) => format!("Invalid token: {e}"),
            RotationError::Persist(e) => format!("Error saving token: {e}"),
            RotationError::Reload(e) => format!("Error reloading token: {e}"),
        }
    }
}

/// Installs new verification keys on behalf of administrators.
pub struct KeyRotator {
    keys: Arc<KeyStore>,
    lock: Mutex<()>,
}

impl KeyRotator {
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self {
            keys,
            lock: Mutex::new(()),
        }
    }

    pub fn keys(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    /// Validate, persist and activate `new_key_blob`.
    ///
    /// Blocking: performs file IO. Concurrent rotations are serialized and
    /// the last one to finish wins.
    pub fn rotate(
        &self,
        new_key_blob: &str,
        requester_is_admin: bool,
    ) -> Result<(), RotationError> {
        if !requester_is_admin {
            return Err(RotationError::Unauthorized);
        }

        let blob = new_key_blob.trim();
        if blob.is_empty() {
            return Err(RotationError::MissingInput);
        }

        let key = decode_key_blob(blob.as_bytes(), self.keys.scheme()).map_err(|e| {
            warn!(error = %e, "Rejected key rotation with invalid blob");
            RotationError::InvalidKey(e)
        })?;

        let _guard = self.lock.lock();

        write_atomic(self.keys.path(), blob.as_bytes()).map_err(|e| {
            warn!(path = %self.keys.path().display(), error = %e, "Failed to persist public key");
            RotationError::Persist(e)
        })?;

        self.keys.reload().map_err(RotationError::Reload)?;

        info!(
            path = %self.keys.path().display(),
            fingerprint = %key.fingerprint(),
            "Public key rotated"
        );
        Ok(())
    }
}

impl std::fmt::Debug for KeyRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRotator")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// Replace `path` with `contents` via temp file, fsync and rename.
///
/// The temp file is removed again when any step fails.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_sibling(path);
    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });

    let result = written.and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// `<file>.tmp-rotate` next to `path`, never equal to `path` itself.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp-rotate");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::scheme::Ed25519;
    use crate::auth::test_support::{sign, signing_key, spki_blob, write_key_file};
    use crate::auth::verifier::{SignatureVerifier, VerificationVerdict};
    use std::thread;
    use tempfile::TempDir;

    fn rotator_with_key(dir: &TempDir, seed: u8) -> KeyRotator {
        let path = write_key_file(dir.path(), &signing_key(seed));
        KeyRotator::new(Arc::new(KeyStore::open(path, Arc::new(Ed25519))))
    }

    #[test]
    fn non_admin_is_refused_before_validation() {
        let dir = TempDir::new().unwrap();
        let rotator = rotator_with_key(&dir, 1);

        let err = rotator.rotate("garbage", false).unwrap_err();
        assert!(matches!(err, RotationError::Unauthorized));
        assert_eq!(err.reply(), "You do not have permission to use this command.");
    }

    #[test]
    fn blank_blob_is_missing_input() {
        let dir = TempDir::new().unwrap();
        let rotator = rotator_with_key(&dir, 1);

        for blob in ["", "   ", "\n\t"] {
            let err = rotator.rotate(blob, true).unwrap_err();
            assert!(matches!(err, RotationError::MissingInput));
        }
    }

    #[test]
    fn invalid_blob_leaves_disk_and_memory_untouched() {
        let dir = TempDir::new().unwrap();
        let rotator = rotator_with_key(&dir, 1);
        let before_file = fs::read(rotator.keys().path()).unwrap();
        let before_key = rotator.keys().current().unwrap();

        let err = rotator.rotate("not-a-key", true).unwrap_err();
        assert!(matches!(err, RotationError::InvalidKey(_)));
        assert!(err.reply().starts_with("Invalid token: "));

        assert_eq!(fs::read(rotator.keys().path()).unwrap(), before_file);
        assert!(Arc::ptr_eq(&before_key, &rotator.keys().current().unwrap()));
        assert!(!temp_sibling(rotator.keys().path()).exists());
    }

    #[test]
    fn valid_blob_replaces_key_on_disk_and_in_memory() {
        let dir = TempDir::new().unwrap();
        let rotator = rotator_with_key(&dir, 1);
        let replacement = signing_key(2);
        let blob = spki_blob(&replacement);

        rotator.rotate(&format!("  {blob}\n"), true).unwrap();

        assert_eq!(fs::read_to_string(rotator.keys().path()).unwrap(), blob);
        assert_eq!(
            rotator.keys().current().unwrap().as_bytes(),
            replacement.verifying_key().as_bytes()
        );
    }

    #[test]
    fn failed_persist_reports_error_and_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // A directory at the key path makes the final rename fail.
        let path = dir.path().join("public_key.pem");
        fs::create_dir_all(path.join("occupied")).unwrap();
        let rotator = KeyRotator::new(Arc::new(KeyStore::new(&path, Arc::new(Ed25519))));

        let err = rotator.rotate(&spki_blob(&signing_key(2)), true).unwrap_err();

        assert!(matches!(err, RotationError::Persist(_)));
        assert!(err.reply().starts_with("Error saving token: "));
        assert!(!temp_sibling(&path).exists());
        assert!(!rotator.keys().is_loaded());
    }

    #[test]
    fn temp_file_never_aliases_key_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.tmp");
        assert_ne!(temp_sibling(&path), path);
        assert_eq!(temp_sibling(&path), dir.path().join("key.tmp.tmp-rotate"));

        let rotator = KeyRotator::new(Arc::new(KeyStore::new(&path, Arc::new(Ed25519))));
        let replacement = signing_key(4);
        rotator.rotate(&spki_blob(&replacement), true).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), spki_blob(&replacement));
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn rotation_installs_first_key_into_empty_store() {
        let dir = TempDir::new().unwrap();
        let keys = Arc::new(KeyStore::open(
            dir.path().join("keys").join("public_key.pem"),
            Arc::new(Ed25519),
        ));
        let rotator = KeyRotator::new(keys);
        assert!(!rotator.keys().is_loaded());

        rotator.rotate(&spki_blob(&signing_key(3)), true).unwrap();
        assert!(rotator.keys().is_loaded());
    }

    #[test]
    fn verifications_see_old_or_new_key_during_rotation() {
        let dir = TempDir::new().unwrap();
        let rotator = Arc::new(rotator_with_key(&dir, 1));
        let old_signer = signing_key(1);
        let new_signer = signing_key(2);
        let new_blob = spki_blob(&new_signer);
        let now = 1_700_000_000_000_i64;
        let data = format!(r#"{{"timestamp":{now}}}"#);
        let old_sig = sign(&old_signer, &data);
        let new_sig = sign(&new_signer, &data);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let keys = Arc::clone(rotator.keys());
                let data = data.clone();
                let old_sig = old_sig.clone();
                let new_sig = new_sig.clone();
                thread::spawn(move || {
                    let verifier = SignatureVerifier::new(Arc::new(Ed25519));
                    for _ in 0..200 {
                        let key = keys.current().unwrap();
                        let old = verifier.verify(data.as_bytes(), &old_sig, Some(&key), now);
                        let new = verifier.verify(data.as_bytes(), &new_sig, Some(&key), now);
                        // Exactly one of the two keys is active in any snapshot.
                        assert_ne!(old.is_valid(), new.is_valid());
                        assert!(
                            old == VerificationVerdict::InvalidSignature
                                || new == VerificationVerdict::InvalidSignature
                        );
                    }
                })
            })
            .collect();

        let writer = {
            let rotator = Arc::clone(&rotator);
            let old_blob = spki_blob(&old_signer);
            thread::spawn(move || {
                for i in 0..20 {
                    let blob = if i % 2 == 0 { &new_blob } else { &old_blob };
                    rotator.rotate(blob, true).unwrap();
                }
            })
        };

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        // Last rotation (i = 19) installed the old key again.
        assert_eq!(
            rotator.keys().current().unwrap().as_bytes(),
            old_signer.verifying_key().as_bytes()
        );
    }
}
