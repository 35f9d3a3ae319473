//! AES-GCM sealing for the volume backend. When an encryption key is
//! configured, each entry is sealed with a fresh nonce on write and opened
//! on read.

use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use k2d_util::error::Error;
use rand::RngCore;

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct EncryptionKey(Key<Aes256Gcm>);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(*Key::<Aes256Gcm>::from_slice(&bytes))
    }

    pub fn generate() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// Seals `plaintext`, prefixing the ciphertext with its fresh nonce so
/// `open` needs no out-of-band state.
pub fn seal(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    let cipher = Aes256Gcm::new(&key.0);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| Error::Store(format!("sealing volume entry: {e}")))?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn open(key: &EncryptionKey, sealed: &[u8]) -> Result<Vec<u8>, Error> {
    if sealed.len() < NONCE_LEN {
        return Err(Error::Store("sealed volume entry truncated".to_string()));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(&key.0);
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| Error::Store(format!("opening volume entry: {e}")))
}

/// Loads the persisted volume-store key, generating and persisting a fresh
/// 32-byte key on first start.
pub fn load_or_generate_key(path: &Path) -> Result<EncryptionKey, Error> {
    if let Ok(bytes) = std::fs::read(path) {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Store(format!("{} does not hold a 32-byte key", path.display())))?;
        return Ok(EncryptionKey::from_bytes(array));
    }
    let bytes = EncryptionKey::generate();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Store(format!("creating {}: {e}", parent.display())))?;
    }
    std::fs::write(path, bytes).map_err(|e| Error::Store(format!("writing {}: {e}", path.display())))?;
    Ok(EncryptionKey::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_round_trips() {
        let key = EncryptionKey::from_bytes(EncryptionKey::generate());
        let sealed = seal(&key, b"hello world").unwrap();
        assert_ne!(sealed, b"hello world");
        let opened = open(&key, &sealed).unwrap();
        assert_eq!(opened, b"hello world");
    }

    #[test]
    fn two_seals_of_same_plaintext_differ() {
        let key = EncryptionKey::from_bytes(EncryptionKey::generate());
        let a = seal(&key, b"same input").unwrap();
        let b = seal(&key, b"same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn load_or_generate_key_persists_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("volume-encryption.key");
        let first = load_or_generate_key(&path).unwrap();
        let second = load_or_generate_key(&path).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn open_with_wrong_key_fails() {
        let key_a = EncryptionKey::from_bytes(EncryptionKey::generate());
        let key_b = EncryptionKey::from_bytes(EncryptionKey::generate());
        let sealed = seal(&key_a, b"secret").unwrap();
        assert!(open(&key_b, &sealed).is_err());
    }
}
