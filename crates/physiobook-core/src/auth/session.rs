use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::Patient;
use crate::store::{SecureStore, StoreError};

/// Storage key for the persisted session record
pub const SESSION_KEY: &str = "patient";

/// The persisted session: the bearer credential plus a snapshot of the
/// patient it belongs to. If a record is present in storage it is assumed
/// structurally valid; freshness is established by the validator, never
/// assumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    pub patient: Patient,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(token: impl Into<String>, patient: Patient) -> Self {
        Self {
            token: token.into(),
            patient,
            created_at: Utc::now(),
        }
    }
}

/// Typed access to the session record in the encrypted store.
///
/// Reads collapse every storage failure to "no session" so that a broken
/// vault degrades to signed-out instead of wedging startup. Writes keep
/// their errors; callers decide whether persistence failure is fatal.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<SecureStore>,
}

impl SessionStore {
    pub fn new(store: Arc<SecureStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Option<SessionRecord> {
        match self.store.get_json::<SessionRecord>(SESSION_KEY).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session, treating as absent");
                None
            }
        }
    }

    pub async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.store.set_json(SESSION_KEY, record).await
    }

    /// Remove the stored record. Idempotent, and failures are logged
    /// rather than propagated so teardown paths can never get stuck.
    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY).await {
            warn!(error = %e, "Failed to clear stored session");
        } else {
            debug!("Stored session cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PATIENT_ROLE;

    fn test_patient(id: &str) -> Patient {
        Patient {
            id: id.to_string(),
            name: Some("Asha Rao".to_string()),
            email: Some("asha@example.com".to_string()),
            phone: None,
            date_of_birth: None,
            gender: None,
            role: PATIENT_ROLE.to_string(),
            profile_picture: None,
            wallet: 100.0,
            is_banned: false,
            banned_until: None,
            is_deleted: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn session_store(dir: &tempfile::TempDir) -> SessionStore {
        let store = SecureStore::with_passphrase(dir.path().to_path_buf(), "test").unwrap();
        SessionStore::new(Arc::new(store))
    }

    #[tokio::test]
    async fn save_load_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = session_store(&dir);

        assert!(sessions.load().await.is_none());

        let record = SessionRecord::new("tok-1", test_patient("p-1"));
        sessions.save(&record).await.unwrap();

        let loaded = sessions.load().await.expect("record should load");
        assert_eq!(loaded.token, "tok-1");
        assert_eq!(loaded.patient.id, "p-1");

        sessions.clear().await;
        assert!(sessions.load().await.is_none());
        // Clearing again must be harmless
        sessions.clear().await;
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = session_store(&dir);

        std::fs::write(dir.path().join("patient.vault"), b"not ciphertext").unwrap();
        assert!(sessions.load().await.is_none());
    }
}
