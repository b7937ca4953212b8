use std::path::PathBuf;

use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use keyring::Entry;
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Keychain service name for the vault master passphrase
const SERVICE_NAME: &str = "physiobook";

/// Keychain account that holds the master passphrase
const MASTER_KEY_ACCOUNT: &str = "vault-key";

/// File holding the Argon2 salt, next to the vault files
const SALT_FILE: &str = "vault.salt";

/// Argon2 salt length in bytes
const SALT_LEN: usize = 16;

/// ChaCha20-Poly1305 nonce length in bytes
const NONCE_LEN: usize = 12;

/// Derived cipher key length in bytes
const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Ciphertext rejected")]
    Crypto,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Encrypted key-value store backed by one file per key.
///
/// All failures on the read path should be treated by callers as "value
/// absent"; the helpers on `auth::SessionStore` do exactly that. Writes
/// surface their errors so callers can decide whether persistence failure
/// matters for the operation at hand.
pub struct SecureStore {
    dir: PathBuf,
    cipher: ChaCha20Poly1305,
}

impl SecureStore {
    /// Open the vault at `dir`, fetching (or creating) the master
    /// passphrase in the OS keychain.
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        let passphrase = Self::load_or_create_passphrase()?;
        Self::with_passphrase(dir, &passphrase)
    }

    /// Open the vault with an explicit passphrase. Used on headless
    /// machines without a keychain, and by tests.
    pub fn with_passphrase(dir: PathBuf, passphrase: &str) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&dir)?;
        let salt = Self::load_or_create_salt(&dir)?;

        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), &salt, &mut key)
            .map_err(|e| StoreError::KeyDerivation(e.to_string()))?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        Ok(Self { dir, cipher })
    }

    fn load_or_create_passphrase() -> Result<String, StoreError> {
        let entry = Entry::new(SERVICE_NAME, MASTER_KEY_ACCOUNT)?;
        match entry.get_password() {
            Ok(passphrase) => Ok(passphrase),
            Err(keyring::Error::NoEntry) => {
                debug!("No vault passphrase in keychain, generating one");
                let mut secret = [0u8; KEY_LEN];
                rand::thread_rng().fill_bytes(&mut secret);
                let passphrase: String = secret.iter().map(|b| format!("{:02x}", b)).collect();
                entry.set_password(&passphrase)?;
                Ok(passphrase)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn load_or_create_salt(dir: &PathBuf) -> Result<Vec<u8>, StoreError> {
        let path = dir.join(SALT_FILE);
        if path.exists() {
            let salt = std::fs::read(&path)?;
            if salt.len() == SALT_LEN {
                return Ok(salt);
            }
            warn!("Vault salt file has unexpected length, regenerating");
        }
        let mut salt = vec![0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        std::fs::write(&path, &salt)?;
        Ok(salt)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers, but never trust them as path segments
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.vault", safe))
    }

    /// Read and decrypt the value stored under `key`. Absent keys return
    /// `Ok(None)`; corrupt or undecryptable entries return an error.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if data.len() <= NONCE_LEN {
            return Err(StoreError::Crypto);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| StoreError::Crypto)?;

        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|_| StoreError::Crypto)
    }

    /// Encrypt and persist `value` under `key`, replacing any previous
    /// value. A fresh nonce is generated per write.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), value.as_bytes())
            .map_err(|_| StoreError::Crypto)?;

        let mut data = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        data.extend_from_slice(&nonce);
        data.extend_from_slice(&ciphertext);

        tokio::fs::write(self.entry_path(key), data).await?;
        Ok(())
    }

    /// Remove the value stored under `key`. Removing an absent key is a
    /// no-op.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Typed read: deserialize the stored JSON value
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Typed write: serialize `value` as JSON before encrypting
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> SecureStore {
        SecureStore::with_passphrase(dir.path().to_path_buf(), "test-passphrase")
            .expect("Failed to open store")
    }

    #[tokio::test]
    async fn round_trips_a_value_through_encryption() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store.set("patient", r#"{"token": "abc"}"#).await.unwrap();

        // The file on disk must not contain the plaintext
        let raw = std::fs::read(dir.path().join("patient.vault")).unwrap();
        assert!(!raw.windows(5).any(|w| w == b"token"));

        let value = store.get("patient").await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"token": "abc"}"#));
    }

    #[tokio::test]
    async fn absent_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store.set("patient", "x").await.unwrap();
        store.remove("patient").await.unwrap();
        store.remove("patient").await.unwrap();
        assert!(store.get("patient").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        std::fs::write(dir.path().join("patient.vault"), b"garbage-bytes-here").unwrap();
        assert!(matches!(
            store.get("patient").await,
            Err(StoreError::Crypto)
        ));
    }

    #[tokio::test]
    async fn values_survive_reopen_with_same_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        open_store(&dir).set("patient", "persisted").await.unwrap();

        let reopened = open_store(&dir);
        assert_eq!(
            reopened.get("patient").await.unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[tokio::test]
    async fn typed_helpers_round_trip_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store.set_json("numbers", &vec![1, 2, 3]).await.unwrap();
        let numbers: Option<Vec<i32>> = store.get_json("numbers").await.unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));
    }
}
