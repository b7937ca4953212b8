//! Encrypted on-device key-value storage.
//!
//! This module provides `SecureStore`, an async get/set/remove vault used
//! to persist the session record between launches. Values are encrypted
//! at rest with ChaCha20-Poly1305; the file key is derived with Argon2id
//! from a master passphrase kept in the OS keychain.

pub mod secure;

pub use secure::{SecureStore, StoreError};
